//! Progress store: persisted "seen" flag and completed-step ids per
//! (deployment, product, route).
//!
//! Two string entries per scope:
//! - `{hash}-{product}-onboarding-{callsign}-{route}` → `"true"` once the tour
//!   was finished
//! - `{hash}-{product}-onboarding-steps-{callsign}-{route}` → JSON array of
//!   completed step ids
//!
//! Storage failures never propagate. Reads fall back to the default record
//! and writes are dropped with a warning, so the tour degrades to
//! always-fresh instead of breaking the host page.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::KeyValueStore;
use crate::error::StorageError;

/// Which persisted record a tour reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressScope {
    /// Deployment identifier from the healthcheck. Empty until it resolves.
    pub deployment_id: String,
    /// Product prefix, e.g. "mtx".
    pub product: String,
    /// Product callsign.
    pub callsign: String,
    /// Route path the tour belongs to.
    pub route: String,
}

impl ProgressScope {
    /// Persistence is disabled until the deployment identity is known.
    pub fn is_resolved(&self) -> bool {
        !self.deployment_id.is_empty()
    }

    pub fn seen_key(&self) -> String {
        format!(
            "{}-{}-onboarding-{}-{}",
            deployment_hash(&self.deployment_id),
            self.product,
            self.callsign,
            self.route
        )
    }

    pub fn steps_key(&self) -> String {
        format!(
            "{}-{}-onboarding-steps-{}-{}",
            deployment_hash(&self.deployment_id),
            self.product,
            self.callsign,
            self.route
        )
    }
}

/// Persisted progress for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// The tour was finished at least once.
    pub seen: bool,
    /// Ids of steps marked done.
    pub completed_step_ids: BTreeSet<String>,
}

/// 8-character namespace for a deployment identifier.
///
/// 32-bit rolling hash (`h = h * 31 + unit`, wrapping) over UTF-16 code
/// units, absolute value, base 36, zero-padded and cut to 8 characters.
/// Keys written by the browser build of the tour use the same layout.
pub fn deployment_hash(deployment_id: &str) -> String {
    let mut hash: i32 = 0;
    for unit in deployment_id.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    let magnitude = i64::from(hash).unsigned_abs();
    let digits = to_base36(magnitude);
    let padded = format!("{digits:0>8}");
    padded[..8].to_string()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Reads and writes [`ProgressRecord`]s through a [`KeyValueStore`].
pub struct ProgressStore {
    storage: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Load the record for a scope. Absent, unreadable or malformed data
    /// yields the default record.
    pub async fn load(&self, scope: &ProgressScope) -> ProgressRecord {
        if !scope.is_resolved() {
            return ProgressRecord::default();
        }

        let seen = match self.storage.get(&scope.seen_key()).await {
            Ok(value) => value.is_some_and(|v| !v.is_empty()),
            Err(e) => {
                warn!(route = %scope.route, "Failed to read onboarding seen flag: {}", e);
                false
            }
        };

        let completed_step_ids = self.read_completed(scope).await.unwrap_or_default();

        ProgressRecord {
            seen,
            completed_step_ids,
        }
    }

    /// Add `step_id` to the completed set and persist it. Idempotent.
    ///
    /// Returns the set as persisted (or as it would have been, if the write
    /// failed).
    pub async fn mark_step_complete(&self, scope: &ProgressScope, step_id: &str) -> BTreeSet<String> {
        self.merge_completed(scope, [step_id]).await
    }

    /// Union `step_ids` with the stored completed set and persist the result.
    ///
    /// A session passes everything it knows is done, so a stored record that
    /// was unreadable or malformed is rewritten in full rather than shrunk.
    pub async fn merge_completed<I, S>(&self, scope: &ProgressScope, step_ids: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !scope.is_resolved() {
            return BTreeSet::new();
        }

        let mut completed = self.read_completed(scope).await.unwrap_or_default();
        completed.extend(step_ids.into_iter().map(|id| id.as_ref().to_string()));

        match serde_json::to_string(&completed) {
            Ok(json) => {
                if let Err(e) = self.storage.set(&scope.steps_key(), &json).await {
                    warn!(route = %scope.route, "Failed to persist onboarding steps: {}", e);
                } else {
                    debug!(route = %scope.route, completed = completed.len(), "Onboarding steps persisted");
                }
            }
            Err(e) => warn!("Failed to serialize completed steps: {}", e),
        }

        completed
    }

    /// Persist the "tour finished" flag.
    pub async fn mark_seen(&self, scope: &ProgressScope) {
        if !scope.is_resolved() {
            return;
        }
        if let Err(e) = self.storage.set(&scope.seen_key(), "true").await {
            warn!(route = %scope.route, "Failed to persist onboarding seen flag: {}", e);
        } else {
            debug!(route = %scope.route, "Onboarding marked seen");
        }
    }

    /// Forget all progress for a scope.
    pub async fn reset(&self, scope: &ProgressScope) {
        if !scope.is_resolved() {
            return;
        }
        for key in [scope.seen_key(), scope.steps_key()] {
            if let Err(e) = self.storage.remove(&key).await {
                warn!(key = %key, "Failed to clear onboarding progress: {}", e);
            }
        }
    }

    async fn read_completed(&self, scope: &ProgressScope) -> Result<BTreeSet<String>, StorageError> {
        let raw = match self.storage.get(&scope.steps_key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(BTreeSet::new()),
            Err(e) => {
                warn!(route = %scope.route, "Failed to read completed onboarding steps: {}", e);
                return Err(e);
            }
        };

        serde_json::from_str::<Vec<String>>(&raw)
            .map(|ids| ids.into_iter().collect())
            .map_err(|e| {
                warn!(route = %scope.route, raw = %raw, "Ignoring malformed completed-steps record: {}", e);
                StorageError::Serialization(e.to_string())
            })
    }
}
