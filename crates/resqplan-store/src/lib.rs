//! Persisted data model and project storage.
//!
//! - [`models`]: the project record, constraint records and the flat
//!   `ModelState` wire format shared by every other crate.
//! - [`store`]: the [`store::ProjectStore`] abstraction plus file-backed and
//!   in-memory implementations.
//! - [`config`]: where the file-backed store keeps its data.

pub mod config;
pub mod models;
pub mod store;

pub use models::{
    ConsEntry, ConstraintRecord, ConstraintSense, ModelState, NewProject, ObjectiveEntry,
    ObjectiveSense, ProjectRecord, ProjectSummary, VarEntry, VarKind,
};
pub use store::{FileProjectStore, MemoryProjectStore, ProjectStore, StoreError, validate_id};
