//! File-storage collaborators.
//!
//! The locator and schema fetcher only need two operations from a storage
//! service: list the entries under a folder and download a file. Backends
//! implement [`FileStore`] and are passed in explicitly.

pub mod local;
pub mod memory;

pub use local::LocalFileStore;
pub use memory::InMemoryFileStore;

use crate::error::ServiceError;
use crate::models::RemoteEntry;

pub trait FileStore {
    /// Entries whose parent folder is `parent_id`
    fn list_entries(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ServiceError>;

    /// Raw content of the file `file_id`
    fn download(&self, file_id: &str) -> Result<Vec<u8>, ServiceError>;
}

impl<S: FileStore + ?Sized> FileStore for &S {
    fn list_entries(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ServiceError> {
        (**self).list_entries(parent_id)
    }

    fn download(&self, file_id: &str) -> Result<Vec<u8>, ServiceError> {
        (**self).download(file_id)
    }
}
