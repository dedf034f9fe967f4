//! In-memory file store for tests and dry runs.

use super::FileStore;
use crate::error::ServiceError;
use crate::models::RemoteEntry;
use std::collections::{HashMap, HashSet};

/// Folder graph held in memory. Entries are keyed by parent folder id, so a
/// folder may be placed under several parents (or under itself) to model
/// graphs that are not trees.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileStore {
    children: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry` under the folder `parent_id`
    pub fn with_entry(mut self, parent_id: &str, entry: RemoteEntry) -> Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(entry);
        self
    }

    /// Add a file entry together with its content
    pub fn with_file(self, parent_id: &str, entry: RemoteEntry, content: impl Into<Vec<u8>>) -> Self {
        let id = entry.id.clone();
        let mut store = self.with_entry(parent_id, entry);
        store.contents.insert(id, content.into());
        store
    }

    /// Make every call touching `id` fail with a storage error
    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn check(&self, id: &str) -> Result<(), ServiceError> {
        if self.failing.contains(id) {
            return Err(ServiceError::storage(format!("simulated failure for '{}'", id)));
        }
        Ok(())
    }
}

impl FileStore for InMemoryFileStore {
    fn list_entries(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ServiceError> {
        self.check(parent_id)?;
        Ok(self.children.get(parent_id).cloned().unwrap_or_default())
    }

    fn download(&self, file_id: &str) -> Result<Vec<u8>, ServiceError> {
        self.check(file_id)?;
        self.contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| ServiceError::storage(format!("file '{}' has no content", file_id)))
    }
}
