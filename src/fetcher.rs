//! Schema discovery in remote folders.

use crate::error::{Result, TabloadError};
use crate::locator::FileLocator;
use crate::schema::TableSchema;
use crate::storage::FileStore;
use tracing::{debug, info};

/// Extension schema definition files are stored with
pub const SCHEMA_EXTENSION: &str = "txt";

/// Locates schema definition files by name and parses them
#[derive(Debug, Clone)]
pub struct SchemaFetcher<S> {
    locator: FileLocator<S>,
}

impl<S: FileStore> SchemaFetcher<S> {
    pub fn new(locator: FileLocator<S>) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &FileLocator<S> {
        &self.locator
    }

    /// Find `file_name` among the `.txt` files below `folder_id`, download it
    /// and parse it as a schema.
    pub fn fetch_schema(&self, folder_id: &str, file_name: &str) -> Result<TableSchema> {
        let candidates = self
            .locator
            .list_files(folder_id, Some(SCHEMA_EXTENSION), None)?;
        debug!(
            "Found {} schema candidates under '{}'",
            candidates.len(),
            folder_id
        );

        let entry = candidates
            .into_iter()
            .find(|entry| entry.name == file_name)
            .ok_or_else(|| TabloadError::NotFound {
                name: file_name.to_string(),
                folder_id: folder_id.to_string(),
            })?;

        let bytes = self.locator.store().download(&entry.id)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| TabloadError::parse(file_name, format!("not UTF-8 text: {}", e)))?;

        let schema = TableSchema::parse(&text, file_name)?;
        info!("Loaded schema '{}' with {} fields", file_name, schema.len());
        Ok(schema)
    }
}
