//! Configuration file management for resqplan.
//!
//! Provides a TOML-based config file at `~/.config/resqplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use resqplan_core::{DEFAULT_ACTIVATION_THRESHOLD, DanglingPolicy, HttpConfig, RetryPolicy};
use resqplan_store::config::StoreConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub model: ModelSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// `file` or `api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScheduleSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_threshold: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelSection {
    /// `lenient` or `strict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangling: Option<String>,
}

// -----------------------------------------------------------------------
// Store kind
// -----------------------------------------------------------------------

/// Where projects are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// One JSON file per project under the data directory.
    #[default]
    File,
    /// The backend's `/api/projects` endpoints.
    Api,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Api => f.write_str("api"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = StoreKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "api" => Ok(Self::Api),
            other => Err(StoreKindParseError(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKindParseError(pub String);

impl fmt::Display for StoreKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid store kind: {:?} (expected \"file\" or \"api\")", self.0)
    }
}

impl std::error::Error for StoreKindParseError {}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the resqplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/resqplan` or `~/.config/resqplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("resqplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("resqplan")
}

/// Return the path to the resqplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Load the config file if there is one. A file that exists but does not
/// parse is an error.
fn load_optional(path: &Path) -> Result<Option<ConfigFile>> {
    if path.exists() {
        load_config(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// The config `resqplan init` writes: every compiled default spelled out.
pub fn initial_config(api_url: &str) -> ConfigFile {
    ConfigFile {
        api: ApiSection {
            base_url: Some(api_url.to_string()),
            timeout_secs: Some(HttpConfig::DEFAULT_TIMEOUT.as_secs()),
        },
        store: StoreSection {
            kind: Some(StoreKind::File.to_string()),
            data_dir: Some(StoreConfig::default_data_dir()),
        },
        pipeline: PipelineSection {
            max_attempts: Some(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
            retry_delay_ms: Some(RetryPolicy::DEFAULT_DELAY.as_millis() as u64),
        },
        schedule: ScheduleSection {
            activation_threshold: Some(DEFAULT_ACTIVATION_THRESHOLD),
        },
        model: ModelSection {
            dangling: Some(DanglingPolicy::default().to_string()),
        },
    }
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub store: Option<StoreKind>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct ResqplanConfig {
    pub http: HttpConfig,
    pub store_kind: StoreKind,
    pub store: StoreConfig,
    pub retry: RetryPolicy,
    pub activation_threshold: f64,
    pub dangling: DanglingPolicy,
}

impl ResqplanConfig {
    /// Resolve configuration from the default config file location.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        Self::resolve_from(cli, &config_path())
    }

    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - API URL: `--api-url` > `RESQPLAN_API_URL` > `api.base_url` > `HttpConfig::DEFAULT_URL`
    /// - Data dir: `--data-dir` > `RESQPLAN_DATA_DIR` > `store.data_dir` > XDG data dir
    /// - Everything else: CLI flag (where one exists) > config file > default
    pub fn resolve_from(cli: &CliOverrides, path: &Path) -> Result<Self> {
        let file = load_optional(path)?.unwrap_or_default();

        let base_url = if let Some(url) = &cli.api_url {
            url.clone()
        } else if let Ok(url) = std::env::var(HttpConfig::ENV_VAR) {
            url
        } else if let Some(url) = &file.api.base_url {
            url.clone()
        } else {
            HttpConfig::DEFAULT_URL.to_string()
        };
        let timeout = file
            .api
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(HttpConfig::DEFAULT_TIMEOUT);
        let http = HttpConfig::new(base_url).with_timeout(timeout);

        let store_kind = match (cli.store, &file.store.kind) {
            (Some(kind), _) => kind,
            (None, Some(kind)) => kind
                .parse()
                .with_context(|| format!("invalid store.kind in {}", path.display()))?,
            (None, None) => StoreKind::default(),
        };

        let store = if let Some(dir) = &cli.data_dir {
            StoreConfig::new(dir)
        } else if let Some(dir) = std::env::var_os(StoreConfig::ENV_VAR) {
            StoreConfig::new(dir)
        } else if let Some(dir) = &file.store.data_dir {
            StoreConfig::new(dir)
        } else {
            StoreConfig::new(StoreConfig::default_data_dir())
        };

        let retry = RetryPolicy::new(
            file.pipeline
                .max_attempts
                .unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
            file.pipeline
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(RetryPolicy::DEFAULT_DELAY),
        );

        let activation_threshold = file
            .schedule
            .activation_threshold
            .unwrap_or(DEFAULT_ACTIVATION_THRESHOLD);
        if !activation_threshold.is_finite() {
            bail!("schedule.activation_threshold must be a finite number");
        }

        let dangling = match &file.model.dangling {
            Some(policy) => policy
                .parse()
                .with_context(|| format!("invalid model.dangling in {}", path.display()))?,
            None => DanglingPolicy::default(),
        };

        Ok(Self {
            http,
            store_kind,
            store,
            retry,
            activation_threshold,
            dangling,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
