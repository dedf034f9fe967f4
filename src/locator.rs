//! Recursive file listing over a [`FileStore`].
//!
//! Walks a folder tree and returns `(name, id, parent folder name)` triples,
//! optionally restricted to one file extension. Traversal depth is bounded
//! and a folder that is its own ancestor is skipped, so folder graphs with
//! cycles terminate. A folder shared by several parents is listed under
//! each of them.

use crate::config::{ExtensionPolicy, TraversalConfig};
use crate::error::{Result, TabloadError};
use crate::models::{EntryKind, RemoteEntry, RemoteFileEntry};
use crate::storage::FileStore;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Extension reported for vendor-native documents
pub const DOCUMENT_EXTENSION: &str = "doc";

#[derive(Debug, Clone)]
pub struct FileLocator<S> {
    store: S,
    config: TraversalConfig,
}

/// Mutable state shared by one listing
struct Walk {
    /// Folders on the path from the root to the current folder
    ancestors: HashSet<String>,
    found: BTreeSet<RemoteFileEntry>,
}

impl<S: FileStore> FileLocator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: TraversalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// List entries below `root_id`.
    ///
    /// With `extension_filter` set, only files whose extension matches
    /// (case-insensitively) are returned and folders are omitted. Without a
    /// filter, folders are returned too and plain files are handled according
    /// to the configured [`ExtensionPolicy`]. Top-level entries carry
    /// `parent_name` as their parent.
    ///
    /// The result contains no duplicates; its order carries no meaning.
    pub fn list_files(
        &self,
        root_id: &str,
        extension_filter: Option<&str>,
        parent_name: Option<&str>,
    ) -> Result<Vec<RemoteFileEntry>> {
        let mut walk = Walk {
            ancestors: HashSet::from([root_id.to_string()]),
            found: BTreeSet::new(),
        };

        self.walk_folder(
            root_id,
            extension_filter.map(str::to_string),
            parent_name,
            0,
            &mut walk,
        )?;

        debug!(
            "Listed {} entries under '{}' (filter: {:?})",
            walk.found.len(),
            root_id,
            extension_filter
        );
        Ok(walk.found.into_iter().collect())
    }

    fn walk_folder(
        &self,
        folder_id: &str,
        mut filter: Option<String>,
        parent_name: Option<&str>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let entries = self.store.list_entries(folder_id)?;

        for entry in entries.into_iter().filter(|e| !e.trashed) {
            if entry.kind == EntryKind::Folder {
                if walk.ancestors.contains(&entry.id) {
                    warn!(
                        "Folder '{}' ({}) is its own ancestor, skipping",
                        entry.name, entry.id
                    );
                    continue;
                }
                if depth + 1 > self.config.max_depth {
                    return Err(TabloadError::TraversalLimit {
                        folder_id: entry.id,
                        max_depth: self.config.max_depth,
                    });
                }

                walk.ancestors.insert(entry.id.clone());
                self.walk_folder(&entry.id, filter.clone(), Some(&entry.name), depth + 1, walk)?;
                walk.ancestors.remove(&entry.id);

                if filter.is_none() {
                    walk.found
                        .insert(RemoteFileEntry::new(entry.name, entry.id, parent_name));
                }
                continue;
            }

            let extension = entry_extension(&entry)?;
            let include = match &filter {
                Some(active) => extension.eq_ignore_ascii_case(active),
                None => {
                    if entry.kind == EntryKind::File
                        && self.config.extension_policy == ExtensionPolicy::InheritFromFirstFile
                    {
                        debug!(
                            "Adopting extension '{}' from '{}' for remaining entries of '{}'",
                            extension, entry.name, folder_id
                        );
                        filter = Some(extension.to_string());
                    }
                    true
                }
            };

            if include {
                walk.found
                    .insert(RemoteFileEntry::new(entry.name, entry.id, parent_name));
            }
        }

        Ok(())
    }
}

/// Extension used for filtering; plain files must carry one
fn entry_extension(entry: &RemoteEntry) -> Result<&str> {
    match entry.kind {
        EntryKind::Document => Ok(DOCUMENT_EXTENSION),
        _ => entry
            .extension
            .as_deref()
            .ok_or_else(|| TabloadError::Lookup {
                entry_id: entry.id.clone(),
                attribute: "extension".to_string(),
            }),
    }
}
