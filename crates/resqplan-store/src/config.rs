use std::env;
use std::path::PathBuf;

/// File-store configuration.
///
/// Reads from the `RESQPLAN_DATA_DIR` environment variable, falling back to
/// the XDG data directory when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one JSON file per project.
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Environment variable that overrides the data directory.
    pub const ENV_VAR: &str = "RESQPLAN_DATA_DIR";

    /// Build a config from the environment.
    ///
    /// Priority: `RESQPLAN_DATA_DIR` env var, then [`Self::default_data_dir`].
    pub fn from_env() -> Self {
        let data_dir = env::var_os(Self::ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_data_dir);
        Self { data_dir }
    }

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `$XDG_DATA_HOME/resqplan/projects`, or `~/.local/share/resqplan/projects`.
    pub fn default_data_dir() -> PathBuf {
        let base = match env::var_os("XDG_DATA_HOME") {
            Some(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
            _ => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share"),
        };
        base.join("resqplan").join("projects")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
