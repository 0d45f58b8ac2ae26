//! `resqplan project ...` and `resqplan context`.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use resqplan_core::{ActiveProject, DanglingPolicy, ProjectSession, from_state};
use resqplan_store::{NewProject, ProjectRecord, ProjectSummary};

use crate::ProjectCommands;
use crate::resolve::resolve_project_id;

pub async fn run_project_command(
    command: ProjectCommands,
    session: &mut ProjectSession,
    policy: DanglingPolicy,
) -> Result<()> {
    match command {
        ProjectCommands::List => {
            let projects = session.list().await?;
            print!("{}", render_project_list(&projects));
        }
        ProjectCommands::Create { name, context } => {
            let context = match context {
                Some(path) => read_text(&path)?,
                None => String::new(),
            };
            let active = session
                .create(NewProject { name, context })
                .await
                .context("failed to create project")?;
            println!("Created project {} ({})", active.name(), active.id());
        }
        ProjectCommands::Show { project } => {
            let id = resolve_project_id(session.store().as_ref(), &project).await?;
            let active = session.open(&id).await?;
            print!("{}", render_project(active));
        }
        ProjectCommands::Delete { project } => {
            let id = resolve_project_id(session.store().as_ref(), &project).await?;
            if session.delete(&id).await? {
                println!("Deleted project {id}.");
            } else {
                println!("Project {id} was already gone.");
            }
        }
        ProjectCommands::Export { project, output } => {
            let id = resolve_project_id(session.store().as_ref(), &project).await?;
            let record = session.open(&id).await?.snapshot();
            export_record(&record, output.as_deref())?;
        }
        ProjectCommands::Import { file } => {
            let record = import_record(session, &file, policy).await?;
            println!(
                "Imported {} as {} ({} constraint(s), {} variable(s))",
                file.display(),
                record.id,
                record.manual_constraints.len(),
                record.gurobi_state.vars.len()
            );
        }
    }
    Ok(())
}

/// `resqplan context <project> <file>`: send a new scheduling context to
/// the backend and save what it extracted.
pub async fn run_context(session: &mut ProjectSession, project: &str, file: &Path) -> Result<()> {
    let text = read_text(file)?;
    let id = resolve_project_id(session.store().as_ref(), project).await?;
    session.open(&id).await?;

    let variables = session
        .set_context(&text)
        .await
        .context("backend could not translate the context")?
        .clone();
    session.close().await?;

    println!("{}", serde_json::to_string_pretty(&variables)?);
    Ok(())
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn render_project_list(projects: &[ProjectSummary]) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<38} {:<30} {:>11} {:<20}",
        "ID", "NAME", "CONSTRAINTS", "SAVED"
    );
    let _ = writeln!(out, "{}", "-".repeat(102));
    for project in projects {
        let name = if project.name.chars().count() > 28 {
            let head: String = project.name.chars().take(25).collect();
            format!("{head}...")
        } else {
            project.name.clone()
        };
        let saved = project
            .saved_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let _ = writeln!(
            out,
            "{:<38} {:<30} {:>11} {:<20}",
            project.id, name, project.constraint_count, saved
        );
    }
    out
}

pub fn render_project(project: &ActiveProject) -> String {
    let record = &project.record;
    let mut out = String::new();
    let _ = writeln!(out, "Project: {} ({})", record.name, record.id);
    if let Some(saved_at) = record.saved_at {
        let _ = writeln!(out, "Saved: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = writeln!(
        out,
        "Model: {} variable(s), {} constraint(s)",
        project.model.num_variables(),
        project.model.num_constraints()
    );
    if !record.context.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Context:");
        for line in record.context.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    if !record.detected_constraints.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Detected constraints:");
        for text in &record.detected_constraints {
            let _ = writeln!(out, "  - {text}");
        }
    }
    let _ = writeln!(out);
    out.push_str(&crate::constraint_cmds::render_constraints(&project.constraints));
    out
}

fn export_record(record: &ProjectRecord, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("cannot write output file: {}", path.display()))?;
            println!("Exported project {} to {}", record.id, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Store an exported project under a fresh id. The stored model must
/// rebuild under `policy` before anything is written.
pub async fn import_record(
    session: &ProjectSession,
    path: &Path,
    policy: DanglingPolicy,
) -> Result<ProjectRecord> {
    let exported: ProjectRecord = serde_json::from_str(&read_text(path)?)
        .with_context(|| format!("{} is not an exported project", path.display()))?;
    from_state(&exported.gurobi_state, policy)
        .with_context(|| format!("model in {} does not rebuild", path.display()))?;

    let store = session.store();
    let created = store
        .create(NewProject {
            name: exported.name.clone(),
            context: exported.context.clone(),
        })
        .await?;
    let record = ProjectRecord {
        id: created.id,
        ..exported
    };
    store.update(&record).await?;
    Ok(record)
}
