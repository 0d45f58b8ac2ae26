//! `resqplan convert` and `resqplan constraint ...`.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use resqplan_core::{
    BatchReport, ConstraintSet, ConversionPipeline, NotificationLevel, ProjectSession,
    RetryPolicy, split_constraint_blocks,
};

use crate::ConstraintCommands;
use crate::project_cmds::read_text;
use crate::resolve::{resolve_project_id, select_constraint};

/// Numbered constraint list with on/off markers.
pub fn render_constraints(set: &ConstraintSet) -> String {
    if set.is_empty() {
        return "No constraints.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Constraints ({} active of {}):",
        set.active_texts().len(),
        set.len()
    );
    for (i, record) in set.records().iter().enumerate() {
        let mark = if record.active { "x" } else { " " };
        let _ = writeln!(out, "  {:>3}. [{mark}] {}", i + 1, record.text);
    }
    out
}

/// Per-item notifications followed by the batch summary.
pub fn render_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    for notification in report.notifications() {
        let _ = writeln!(out, "{notification}");
    }
    let _ = writeln!(out, "{}", report.summary());
    out
}

/// `resqplan convert <project> <file>`: split the file into constraints on
/// blank lines and convert them one after another.
pub async fn run_convert(
    session: &mut ProjectSession,
    project: &str,
    file: &Path,
    retry: RetryPolicy,
) -> Result<()> {
    let texts = split_constraint_blocks(&read_text(file)?);
    if texts.is_empty() {
        bail!("{} contains no constraints", file.display());
    }

    let id = resolve_project_id(session.store().as_ref(), project).await?;
    session.open(&id).await?;
    let pipeline = ConversionPipeline::new(session.backend().clone(), retry);

    let Some(active) = session.active_mut() else {
        bail!("project {id} did not stay open");
    };
    let report = pipeline
        .convert_batch(&texts, &mut active.constraints, |done, total| {
            eprint!("\rConverting {done}/{total}...");
            if done == total {
                eprintln!();
            }
        })
        .await;

    session
        .close()
        .await
        .context("converted constraints could not be saved")?;
    info!(project_id = %id, inserted = report.inserted(), "conversion batch saved");

    print!("{}", render_batch(&report));
    if report.summary().level == NotificationLevel::Error {
        bail!("some constraints could not be converted");
    }
    Ok(())
}

pub async fn run_constraint_command(
    command: ConstraintCommands,
    session: &mut ProjectSession,
) -> Result<()> {
    let project = match &command {
        ConstraintCommands::List { project }
        | ConstraintCommands::Edit { project, .. }
        | ConstraintCommands::Toggle { project, .. }
        | ConstraintCommands::Delete { project, .. }
        | ConstraintCommands::View { project, .. } => project.clone(),
    };
    let id = resolve_project_id(session.store().as_ref(), &project).await?;
    let constraints = session.open(&id).await?.constraints.clone();

    match command {
        ConstraintCommands::List { .. } => {
            print!("{}", render_constraints(&constraints));
            return Ok(());
        }
        ConstraintCommands::Edit { selector, text, .. } => {
            let old = select_constraint(&constraints, &selector)?;
            session.edit_constraint(&old, &text).await?;
            println!("Constraint updated: {}", text.trim());
        }
        ConstraintCommands::Toggle { selector, .. } => {
            let text = select_constraint(&constraints, &selector)?;
            let active = session.toggle_constraint(&text)?;
            let state = if active { "enabled" } else { "disabled" };
            println!("Constraint {state}: {text}");
        }
        ConstraintCommands::Delete { selector, .. } => {
            let text = select_constraint(&constraints, &selector)?;
            session.delete_constraint(&text).await?;
            println!("Constraint deleted: {text}");
        }
        ConstraintCommands::View { selector, .. } => {
            let text = select_constraint(&constraints, &selector)?;
            println!("{}", session.view_constraint(&text).await?);
            return Ok(());
        }
    }

    session.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use resqplan_core::backend::BackendError;
    use resqplan_core::{ConversionOutcome, pipeline::ConversionReport};

    use super::*;

    #[test]
    fn constraints_are_numbered_and_marked() {
        let mut set = ConstraintSet::new();
        set.insert_if_absent("no nights").unwrap();
        set.insert_if_absent("weekends off").unwrap();
        set.toggle("weekends off").unwrap();

        let out = render_constraints(&set);
        assert_eq!(
            out,
            "Constraints (1 active of 2):\n    1. [x] no nights\n    2. [ ] weekends off\n"
        );
        assert_eq!(render_constraints(&ConstraintSet::new()), "No constraints.\n");
    }

    #[test]
    fn batch_output_ends_with_summary() {
        let report = BatchReport {
            items: vec![
                ConversionReport {
                    text: "a".into(),
                    outcome: ConversionOutcome::Accepted { inserted: true },
                    trace: Default::default(),
                },
                ConversionReport {
                    text: "b".into(),
                    outcome: ConversionOutcome::Failed {
                        attempts: 3,
                        error: BackendError::Transport("refused".into()),
                    },
                    trace: Default::default(),
                },
            ],
        };
        let out = render_batch(&report);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[success] Constraint added: a");
        assert!(lines[1].starts_with("[error] Could not convert constraint after 3 attempt(s)"));
        assert_eq!(
            lines[2],
            "[error] 1/2 constraint(s) accepted, 1 new, 0 rejected, 1 failed"
        );
    }
}
