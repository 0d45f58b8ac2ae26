//! `resqplan optimize <project>`.

use anyhow::{Context, Result};

use resqplan_core::{ProjectSession, optimize};

use crate::resolve::resolve_project_id;
use crate::schedule_cmds::render_schedule;

pub async fn run_optimize(
    session: &mut ProjectSession,
    project: &str,
    filter: &str,
    threshold: f64,
) -> Result<()> {
    let id = resolve_project_id(session.store().as_ref(), project).await?;
    let backend = session.backend().clone();
    let active = session.open(&id).await?;
    println!(
        "Optimizing {} with {} active constraint(s)...",
        active.name(),
        active.active_constraints().len()
    );

    let report = optimize(backend.as_ref(), active, threshold)
        .await
        .with_context(|| format!("optimization of project {id} failed"))?;
    print!(
        "{}",
        render_schedule(&report.grid, filter, &report.relaxed, report.stats)?
    );
    Ok(())
}
