//! The backend API the client talks to.
//!
//! Natural-language translation, constraint conversion and solving all
//! happen server-side. This module defines the request/response shapes, the
//! object-safe [`Backend`] trait the rest of the crate programs against, and
//! the HTTP implementations of that trait and of
//! [`resqplan_store::ProjectStore`].

pub mod http;
pub mod store;
pub mod trait_def;
pub mod types;

pub use http::{HttpBackend, HttpConfig};
pub use store::HttpProjectStore;
pub use trait_def::Backend;
pub use types::{
    ActionResponse, BackendError, ConvertResponse, OptimizeResponse, SolutionPayload,
    ViewResponse,
};
