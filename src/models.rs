//! Core data structures shared across the load pipeline.
//!
//! Defines remote storage entries, table references, write modes and the
//! outcome/report types returned by the loader.

use crate::error::{Result, ServiceError, TabloadError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of entry returned by a file store listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Folder,
    /// Vendor-native document with no file extension of its own
    Document,
    File,
}

/// Raw entry as reported by a [`crate::storage::FileStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    pub extension: Option<String>,
    pub trashed: bool,
}

impl RemoteEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder,
            extension: None,
            trashed: false,
        }
    }

    pub fn document(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Document,
            extension: None,
            trashed: false,
        }
    }

    /// Plain file; the extension is taken from the text after the last dot
    /// of the name, if any.
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.is_empty());
        Self {
            id: id.into(),
            name,
            kind: EntryKind::File,
            extension,
            trashed: false,
        }
    }

    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension.map(str::to_string);
        self
    }

    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Entry produced by the file locator: `(name, id, parent folder name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    pub name: String,
    pub id: String,
    pub parent_name: Option<String>,
}

impl RemoteFileEntry {
    pub fn new(name: impl Into<String>, id: impl Into<String>, parent_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            parent_name: parent_name.map(str::to_string),
        }
    }
}

/// Policy governing how a load job affects existing table contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WriteMode {
    /// Add rows to the existing table
    #[default]
    Append,
    /// Replace all existing table contents
    Truncate,
    /// Fail if the table already holds rows
    Empty,
}

impl WriteMode {
    /// Write disposition token understood by the warehouse
    pub fn disposition(&self) -> &'static str {
        match self {
            WriteMode::Append => "WRITE_APPEND",
            WriteMode::Truncate => "WRITE_TRUNCATE",
            WriteMode::Empty => "WRITE_EMPTY",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.disposition())
    }
}

/// Fully resolved `project.dataset.table` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Parse a `dataset.table` name within `project`
    pub fn parse(dataset_table: &str, project: impl Into<String>) -> Result<Self> {
        match dataset_table.split_once('.') {
            Some((dataset, table))
                if !dataset.is_empty() && !table.is_empty() && !table.contains('.') =>
            {
                Ok(Self::new(project, dataset, table))
            }
            _ => Err(TabloadError::configuration(format!(
                "table name '{}' must have the form dataset.table",
                dataset_table
            ))),
        }
    }

    /// `dataset.table` form, without the project
    pub fn dataset_table(&self) -> String {
        format!("{}.{}", self.dataset, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Caller-facing load target; the project falls back to the warehouse default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub dataset_id: String,
    pub table_id: String,
    pub project: Option<String>,
}

impl LoadTarget {
    pub fn new(dataset_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            project: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn resolve(&self, default_project: &str) -> TableRef {
        TableRef::new(
            self.project.as_deref().unwrap_or(default_project),
            &self.dataset_id,
            &self.table_id,
        )
    }
}

/// Result of a load job; the warehouse job is all-or-nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Success,
    Failed(ServiceError),
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Success)
    }
}

/// Columns dropped while aligning a dataset with its schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentDiff {
    pub dataset_only: BTreeSet<String>,
    pub schema_only: BTreeSet<String>,
}

impl AlignmentDiff {
    pub fn is_empty(&self) -> bool {
        self.dataset_only.is_empty() && self.schema_only.is_empty()
    }
}

/// Outcome of the type coercion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    /// Columns converted to nullable integers
    pub converted: Vec<String>,
    /// Columns left unconverted, with the reason
    pub skipped: Vec<(String, String)>,
}

/// Everything the loader learned while running one load
#[derive(Debug, Clone)]
#[must_use]
pub struct LoadReport {
    pub table: TableRef,
    pub write_mode: WriteMode,
    pub diff: AlignmentDiff,
    pub coercion: CoercionReport,
    /// Columns actually submitted, in order
    pub submitted_columns: Vec<String>,
    pub outcome: LoadOutcome,
}
