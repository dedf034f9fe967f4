//! Directory-backed file store.
//!
//! Ids are `/`-separated paths relative to the store root; the root itself
//! has the empty id.

use super::FileStore;
use crate::error::ServiceError;
use crate::models::RemoteEntry;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an id to a path below the root, rejecting escapes
    fn resolve(&self, id: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(id);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ServiceError::storage(format!(
                "id '{}' does not name a path inside the store",
                id
            )));
        }
        Ok(self.root.join(relative))
    }

    fn child_id(parent_id: &str, name: &str) -> String {
        let parent = parent_id.trim_end_matches('/');
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent, name)
        }
    }
}

impl FileStore for LocalFileStore {
    fn list_entries(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ServiceError> {
        let dir = self.resolve(parent_id)?;
        let read_dir = fs::read_dir(&dir).map_err(|e| {
            ServiceError::storage(format!("cannot list '{}': {}", dir.display(), e))
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry
                .map_err(|e| ServiceError::storage(format!("cannot read entry: {}", e)))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let id = Self::child_id(parent_id, &name);
            let path = entry.path();

            if path.is_dir() {
                entries.push(RemoteEntry::folder(id, name));
            } else {
                let extension = path.extension().and_then(|ext| ext.to_str());
                entries.push(RemoteEntry::file(id, name.as_str()).with_extension(extension));
            }
        }

        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} entries under '{}'", entries.len(), dir.display());
        Ok(entries)
    }

    fn download(&self, file_id: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.resolve(file_id)?;
        fs::read(&path)
            .map_err(|e| ServiceError::storage(format!("cannot read '{}': {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use tempfile::TempDir;

    fn create_tree(temp_dir: &TempDir) {
        let root = temp_dir.path();
        fs::create_dir_all(root.join("reports").join("2024")).unwrap();
        fs::write(root.join("a.csv"), "x\n1\n").unwrap();
        fs::write(root.join("README"), "notes").unwrap();
        fs::write(root.join("reports").join("2024").join("q1.csv"), "x\n2\n").unwrap();
    }

    #[test]
    fn test_list_entries() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(&temp_dir);
        let store = LocalFileStore::new(temp_dir.path());

        let entries = store.list_entries("").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README", "a.csv", "reports"]);

        let readme = &entries[0];
        assert_eq!(readme.kind, EntryKind::File);
        assert_eq!(readme.extension, None);

        let reports = &entries[2];
        assert_eq!(reports.kind, EntryKind::Folder);
        assert_eq!(reports.id, "reports");

        let nested = store.list_entries("reports/2024").unwrap();
        assert_eq!(nested[0].id, "reports/2024/q1.csv");
        assert_eq!(nested[0].extension.as_deref(), Some("csv"));
    }

    #[test]
    fn test_download() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(&temp_dir);
        let store = LocalFileStore::new(temp_dir.path());

        assert_eq!(store.download("a.csv").unwrap(), b"x\n1\n");
        assert!(store.download("missing.csv").is_err());
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path().join("inner"));

        let err = store.list_entries("../").unwrap_err();
        assert_eq!(err.service, "storage");
        assert!(store.download("/etc/passwd").is_err());
    }
}
