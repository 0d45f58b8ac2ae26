//! Project storage.
//!
//! Every persistence backend implements [`ProjectStore`]. The trait is object
//! safe so sessions hold an `Arc<dyn ProjectStore>` and never care whether
//! projects live on disk, in memory, or behind the HTTP API.

mod file;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewProject, ProjectRecord, ProjectSummary};

pub use file::FileProjectStore;
pub use memory::MemoryProjectStore;

/// Errors raised by project stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("project {0:?} not found")]
    NotFound(String),

    #[error("invalid project id {0:?}")]
    InvalidId(String),

    #[error("remote store error: {0}")]
    Remote(String),
}

/// Persistence for project records.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Short label for logs (`"file"`, `"memory"`, `"api"`).
    fn kind(&self) -> &str;

    /// List all projects, most recently saved first.
    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError>;

    /// Fetch one project; `Ok(None)` when it does not exist.
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, StoreError>;

    /// Create a project and return the stored record (with its assigned id).
    async fn create(&self, project: NewProject) -> Result<ProjectRecord, StoreError>;

    /// Replace an existing project. Fails with [`StoreError::NotFound`] if
    /// the id is unknown.
    async fn update(&self, project: &ProjectRecord) -> Result<(), StoreError>;

    /// Delete a project. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

// Compile-time assertion: ProjectStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ProjectStore) {}
};

/// Project ids double as file names, so restrict them to a safe alphabet.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_owned()))
    }
}
