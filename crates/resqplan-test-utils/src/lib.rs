//! Shared test utilities for resqplan integration tests.
//!
//! Two stand-ins for the real server:
//! - [`ScriptedBackend`]: an in-process [`resqplan_core::Backend`] with
//!   queued responses and a call log. No sockets.
//! - [`MockApi`]: an axum server speaking the real HTTP API on an ephemeral
//!   port, for exercising `HttpBackend` and `HttpProjectStore`.

mod mock_api;
mod scripted;

pub use mock_api::{MockApi, MockApiState, build_router};
pub use scripted::{BackendCall, ScriptedBackend};
