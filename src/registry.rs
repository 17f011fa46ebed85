//! Process-wide index registry.
//!
//! Single authoritative mapping from organization id to its resident
//! [`KnowledgeIndex`]. Constructed once at process start, shared via `Arc`,
//! torn down at shutdown. Entries are created on ingestion, never evicted,
//! and lost on restart — the metadata store outliving the registry is the
//! source of the `IndexUnavailable` condition.
//!
//! `put` is write-once per key; the write lock serializes concurrent
//! registrations so that two ingestions for the same id cannot both
//! succeed. Reads on distinct ids proceed in parallel under the read lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{CoreError, CoreResult};
use crate::index::KnowledgeIndex;

/// Write-once cache of all knowledge indexes for the process lifetime.
pub struct IndexRegistry {
    indexes: RwLock<HashMap<String, Arc<KnowledgeIndex>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Register an organization's index. At-most-once per id:
    /// a second `put` fails with [`CoreError::AlreadyIndexed`] and leaves
    /// the original index untouched.
    pub fn put(&self, org_id: &str, index: KnowledgeIndex) -> CoreResult<()> {
        let mut indexes = self.indexes.write().unwrap();
        if indexes.contains_key(org_id) {
            return Err(CoreError::AlreadyIndexed(org_id.to_string()));
        }
        indexes.insert(org_id.to_string(), Arc::new(index));
        Ok(())
    }

    /// Unregister an organization's index.
    ///
    /// Exists solely so ingestion can roll back a registration whose
    /// metadata persist failed; there is no general eviction path, and
    /// nothing on the query side removes entries.
    pub fn remove(&self, org_id: &str) -> Option<Arc<KnowledgeIndex>> {
        self.indexes.write().unwrap().remove(org_id)
    }

    /// Look up an organization's index. `None` means "not resident" — the
    /// caller distinguishes never-registered from lost-on-restart by
    /// consulting the metadata store.
    pub fn get(&self, org_id: &str) -> Option<Arc<KnowledgeIndex>> {
        self.indexes.read().unwrap().get(org_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.indexes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.read().unwrap().is_empty()
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}
