//! Solve the open project and turn the solution into a schedule grid.

use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{Backend, BackendError, SolutionPayload};
use crate::grid::{BuildStats, ScheduleGrid, dedup_relaxed};
use crate::session::ActiveProject;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The solver ran but reported no optimal solution.
    #[error("no solution: {0}")]
    NoSolution(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeReport {
    pub grid: ScheduleGrid,
    /// Constraints the solver relaxed to reach feasibility, without
    /// duplicates, in the order reported.
    pub relaxed: Vec<String>,
    pub stats: BuildStats,
}

/// Solve `project` with its active constraints.
pub async fn optimize(
    backend: &dyn Backend,
    project: &ActiveProject,
    threshold: f64,
) -> Result<OptimizeReport, OptimizeError> {
    let active = project.active_constraints();
    debug!(project_id = %project.id(), constraints = active.len(), "optimizing");

    let response = backend.optimize(&active).await?;
    let values = match response.solution {
        SolutionPayload::Values(values) => values,
        SolutionPayload::Message(message) => return Err(OptimizeError::NoSolution(message)),
    };

    let (grid, stats) = ScheduleGrid::build_with_stats(&values, threshold);
    let relaxed = dedup_relaxed(&response.relaxed_constraints);
    info!(
        project_id = %project.id(),
        entries = grid.entry_count(),
        dropped = stats.dropped,
        relaxed = relaxed.len(),
        "solution decoded"
    );
    Ok(OptimizeReport {
        grid,
        relaxed,
        stats,
    })
}
