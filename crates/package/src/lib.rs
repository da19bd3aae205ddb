//! # tcex Package
//!
//! Validates an App directory and builds the `.tcx` archive that is uploaded
//! to the ThreatConnect platform.

pub mod package;
pub mod validate;

pub use package::{AppMetadata, PackageReport, Packager};
pub use validate::{FileSyntax, SyntaxStatus, ValidationReport, Validator};
