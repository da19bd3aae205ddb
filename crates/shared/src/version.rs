//! Semantic version checks

use regex::Regex;
use std::sync::OnceLock;

fn semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
        )
        .expect("semver pattern is valid")
    })
}

/// Check that `value` is `MAJOR.MINOR.PATCH[-pre][+build]`
pub fn is_semver(value: &str) -> bool {
    semver_regex().is_match(value)
}
