//! Solution decoding and model interchange for resqplan.
//!
//! - [`decode`] and [`grid`]: solver keys to a slot x day schedule grid.
//! - [`expr`], [`model`] and [`codec`]: the live linear model and its flat
//!   `ModelState` storage form.
//! - [`constraints`] and [`pipeline`]: natural-language constraint records
//!   and their conversion through the backend.
//! - [`session`] and [`optimize`]: the open-project context and the solve
//!   flow.
//! - [`backend`]: the server API, over HTTP or scripted in tests.

pub mod backend;
pub mod codec;
pub mod constraints;
pub mod decode;
pub mod expr;
pub mod grid;
pub mod model;
pub mod optimize;
pub mod pipeline;
pub mod session;

pub use backend::{Backend, BackendError, HttpBackend, HttpConfig, HttpProjectStore};
pub use codec::{CodecError, StateEquivalence, from_state, to_state};
pub use constraints::{ConstraintError, ConstraintSet, InsertOutcome, split_constraint_blocks};
pub use decode::{Assignment, DecodedKey, decode};
pub use expr::{DanglingPolicy, ExprError, LinearTerm, parse_terms, render_terms};
pub use grid::{DEFAULT_ACTIVATION_THRESHOLD, FILTER_ALL, RenderedGrid, ScheduleGrid};
pub use model::{LinearExpr, LinearModel, ModelError};
pub use optimize::{OptimizeError, OptimizeReport, optimize};
pub use pipeline::{
    BatchReport, ConversionOutcome, ConversionPipeline, ConversionState, Notification,
    NotificationLevel, RetryPolicy,
};
pub use session::{ActiveProject, ProjectSession, SessionError};
