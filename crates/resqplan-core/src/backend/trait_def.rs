//! The `Backend` trait: everything the client asks of the server.
//!
//! Implemented over HTTP by [`super::HttpBackend`] and in-process by the
//! scripted backend used in tests. Object safe, so sessions and pipelines
//! hold `Arc<dyn Backend>`.

use async_trait::async_trait;

use super::types::{ActionResponse, BackendError, ConvertResponse, OptimizeResponse, ViewResponse};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Extract the scheduling variables from a free-text context.
    async fn translate(&self, context: &str) -> Result<serde_json::Value, BackendError>;

    /// Convert one natural-language constraint for the current context.
    async fn convert(&self, constraint: &str) -> Result<ConvertResponse, BackendError>;

    /// Solve with the given active constraints.
    async fn optimize(&self, active_constraints: &[String])
    -> Result<OptimizeResponse, BackendError>;

    async fn edit_constraint(
        &self,
        old_nl: &str,
        new_nl: &str,
    ) -> Result<ActionResponse, BackendError>;

    async fn delete_constraint(&self, nl: &str) -> Result<ActionResponse, BackendError>;

    /// Show the solver code generated for a constraint.
    async fn view_constraint(&self, nl: &str) -> Result<ViewResponse, BackendError>;
}

// Compile-time assertion: Backend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Backend) {}
};
