mod config;
mod constraint_cmds;
mod model_cmd;
mod optimize_cmd;
mod project_cmds;
mod resolve;
mod schedule_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use resqplan_core::{Backend, FILTER_ALL, HttpBackend, HttpConfig, HttpProjectStore, ProjectSession};
use resqplan_store::{FileProjectStore, ProjectStore};

use config::{CliOverrides, ResqplanConfig, StoreKind};

#[derive(Parser)]
#[command(
    name = "resqplan",
    about = "Shift scheduling from natural-language constraints"
)]
struct Cli {
    /// Backend base URL (overrides RESQPLAN_API_URL env var)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Project data directory for the file store (overrides RESQPLAN_DATA_DIR env var)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Where projects live: file or api
    #[arg(long, global = true)]
    store: Option<StoreKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a resqplan config file
    Init {
        /// Backend base URL
        #[arg(long, default_value = HttpConfig::DEFAULT_URL)]
        api_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Decode solver variable keys into (entities, day, slot)
    Decode {
        /// Keys such as `x(Ana, 0, 1)` or `x_Ana_0_1`
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Render a saved solution as a slot x day grid
    Grid {
        /// JSON file: a key -> value map, or a saved optimize response
        file: PathBuf,
        /// Show only one entity (or ALL)
        #[arg(long, default_value = FILTER_ALL)]
        filter: String,
        /// Activation threshold (values strictly above it are active)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Send a scheduling context to the backend and store what it extracts
    Context {
        /// Project id or name
        project: String,
        /// Text file with the context description
        file: PathBuf,
    },
    /// Convert natural-language constraints (one per blank-line-separated block)
    Convert {
        /// Project id or name
        project: String,
        /// Text file with the constraints
        file: PathBuf,
    },
    /// Constraint management
    Constraint {
        #[command(subcommand)]
        command: ConstraintCommands,
    },
    /// Solve a project with its active constraints and show the schedule
    Optimize {
        /// Project id or name
        project: String,
        /// Show only one entity (or ALL)
        #[arg(long, default_value = FILTER_ALL)]
        filter: String,
        /// Activation threshold (values strictly above it are active)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Stored model utilities
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },
    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects, most recently saved first
    List,
    /// Create a project
    Create {
        /// Project name
        name: String,
        /// Text file with the initial scheduling context
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Show project details and constraints
    Show {
        /// Project id or name
        project: String,
    },
    /// Delete a project
    Delete {
        /// Project id or name
        project: String,
    },
    /// Export a project as JSON
    Export {
        /// Project id or name
        project: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import an exported project under a new id
    Import {
        /// Exported project JSON
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConstraintCommands {
    /// List a project's constraints
    List {
        /// Project id or name
        project: String,
    },
    /// Replace a constraint's text
    Edit {
        /// Project id or name
        project: String,
        /// Constraint text or its number in `constraint list`
        selector: String,
        /// New text
        text: String,
    },
    /// Switch a constraint on or off
    Toggle {
        /// Project id or name
        project: String,
        /// Constraint text or its number in `constraint list`
        selector: String,
    },
    /// Delete a constraint
    Delete {
        /// Project id or name
        project: String,
        /// Constraint text or its number in `constraint list`
        selector: String,
    },
    /// Show the solver code generated for a constraint
    View {
        /// Project id or name
        project: String,
        /// Constraint text or its number in `constraint list`
        selector: String,
    },
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Rebuild a stored model state and check it survives a round trip
    Check {
        /// ModelState JSON, or an exported project
        file: PathBuf,
    },
}

/// Execute the `resqplan init` command: write config file.
fn cmd_init(api_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::initial_config(api_url);
    config::save_config(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  api.base_url = {api_url}");
    if let Some(dir) = &cfg.store.data_dir {
        println!("  store.data_dir = {}", dir.display());
    }
    println!();
    println!("Next: run `resqplan project create <name>` to start a project.");

    Ok(())
}

/// Build the session every project command works through.
fn open_session(config: &ResqplanConfig) -> ProjectSession {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.http));
    let store: Arc<dyn ProjectStore> = match config.store_kind {
        StoreKind::File => Arc::new(FileProjectStore::from_config(&config.store)),
        StoreKind::Api => Arc::new(HttpProjectStore::new(&config.http)),
    };
    tracing::debug!(
        store = store.kind(),
        api = %config.http.base_url,
        "session configured"
    );
    ProjectSession::new(store, backend).with_dangling_policy(config.dangling)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        api_url: cli.api_url.clone(),
        data_dir: cli.data_dir.clone(),
        store: cli.store,
    };

    match cli.command {
        Commands::Init { api_url, force } => {
            cmd_init(&api_url, force)?;
        }
        Commands::Decode { keys } => {
            schedule_cmds::run_decode(&keys)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "resqplan",
                &mut std::io::stdout(),
            );
        }
        Commands::Grid {
            file,
            filter,
            threshold,
        } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let threshold = threshold.unwrap_or(resolved.activation_threshold);
            schedule_cmds::run_grid(&file, &filter, threshold)?;
        }
        Commands::Model { command } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            match command {
                ModelCommands::Check { file } => {
                    model_cmd::run_model_check(&file, resolved.dangling)?;
                }
            }
        }
        Commands::Project { command } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let mut session = open_session(&resolved);
            project_cmds::run_project_command(command, &mut session, resolved.dangling).await?;
        }
        Commands::Context { project, file } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let mut session = open_session(&resolved);
            project_cmds::run_context(&mut session, &project, &file).await?;
        }
        Commands::Convert { project, file } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let mut session = open_session(&resolved);
            constraint_cmds::run_convert(&mut session, &project, &file, resolved.retry).await?;
        }
        Commands::Constraint { command } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let mut session = open_session(&resolved);
            constraint_cmds::run_constraint_command(command, &mut session).await?;
        }
        Commands::Optimize {
            project,
            filter,
            threshold,
        } => {
            let resolved = ResqplanConfig::resolve(&overrides)?;
            let threshold = threshold.unwrap_or(resolved.activation_threshold);
            let mut session = open_session(&resolved);
            optimize_cmd::run_optimize(&mut session, &project, &filter, threshold).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "resqplan",
            "--store",
            "api",
            "constraint",
            "toggle",
            "ward",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(StoreKind::Api));
        assert!(matches!(
            cli.command,
            Commands::Constraint {
                command: ConstraintCommands::Toggle { ref project, ref selector }
            } if project == "ward" && selector == "2"
        ));
    }

    #[test]
    fn grid_filter_defaults_to_all() {
        let cli = Cli::try_parse_from(["resqplan", "grid", "solution.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Grid { ref filter, threshold: None, .. } if filter == FILTER_ALL
        ));
    }

    #[test]
    fn decode_requires_a_key() {
        assert!(Cli::try_parse_from(["resqplan", "decode"]).is_err());
    }
}
