//! `KeyValueStore` trait, the client-side storage the tour persists into.
//!
//! Mirrors browser local storage: string keys, string values, synchronous
//! from the caller's point of view (every write is awaited before the
//! triggering transition returns).

use async_trait::async_trait;

use crate::error::StorageError;

/// Backend-agnostic string key/value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}
