//! Persistence layer: client-side key/value storage and the progress store
//! built on top of it.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod progress;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use progress::{ProgressRecord, ProgressScope, ProgressStore, deployment_hash};
pub use traits::KeyValueStore;
