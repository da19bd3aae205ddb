//! # tcex Run
//!
//! Local execution support for Apps: playbook variable staging into a
//! key/value store, a fake Redis server for machines without one, the App
//! launcher and the `app_inputs.json` generator.

pub mod app_input;
pub mod fake_redis;
pub mod kvstore;
pub mod launch;
pub mod stager;
pub mod variable;

// Re-exports
pub use app_input::AppInputGenerator;
pub use fake_redis::{ensure_kvstore, FakeRedisHandle, FakeRedisServer};
pub use kvstore::{KvStore, MemoryKvStore, RedisKvStore};
pub use launch::{kvstore_address, playbook_context, Launcher};
pub use stager::stage;
pub use variable::{detect_type, PlaybookDataType, StagedVariable};
