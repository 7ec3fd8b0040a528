//! Configuration file management for sprintgraph.
//!
//! Provides a TOML-based config file at `~/.config/sprintgraph/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sprintgraph_core::allocation::DEFAULT_CAPACITY_HOURS;
use sprintgraph_core::plan::builder::{DEFAULT_HOURLY_RATE, DEFAULT_HOURS_PER_DAY};
use sprintgraph_core::plan::{BuildOptions, DependencyMode};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

pub const ENV_HOURS_PER_DAY: &str = "SPRINTGRAPH_HOURS_PER_DAY";
pub const ENV_HOURLY_RATE: &str = "SPRINTGRAPH_HOURLY_RATE";
pub const ENV_DEPENDENCY_MODE: &str = "SPRINTGRAPH_DEPENDENCY_MODE";
pub const ENV_BIND: &str = "SPRINTGRAPH_BIND";
pub const ENV_PORT: &str = "SPRINTGRAPH_PORT";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

/// On-disk config. Every section and key is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub estimates: EstimatesSection,
    pub validation: ValidationSection,
    pub server: ServerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatesSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<u32>,
    /// Per-owner capacity used for allocation reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_hours: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMode>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ConfigFile {
    /// A config with every key set to its built-in default, as written by
    /// `sprintgraph init`.
    pub fn with_defaults() -> Self {
        Self {
            estimates: EstimatesSection {
                hours_per_day: Some(DEFAULT_HOURS_PER_DAY),
                hourly_rate: Some(DEFAULT_HOURLY_RATE),
                capacity_hours: Some(DEFAULT_CAPACITY_HOURS),
            },
            validation: ValidationSection {
                dependencies: Some(DependencyMode::Silent),
            },
            server: ServerSection {
                bind: Some(DEFAULT_BIND.to_string()),
                port: Some(DEFAULT_PORT),
            },
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the sprintgraph config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/sprintgraph` or
/// `~/.config/sprintgraph`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("sprintgraph");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("sprintgraph")
}

/// Return the path to the sprintgraph config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
}

/// Load the config file if there is one. A file that exists but does not
/// parse is still an error.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    if config_path().exists() {
        load_config().map(Some)
    } else {
        Ok(None)
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub hours_per_day: Option<u32>,
    pub hourly_rate: Option<u32>,
    pub dependency_mode: Option<DependencyMode>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintgraphConfig {
    pub build: BuildOptions,
    pub capacity_hours: u32,
    pub bind: String,
    pub port: u16,
}

impl SprintgraphConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// `capacity_hours` has no env var or flag; it comes from the file or
    /// the default.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config_if_present()?.unwrap_or_default();
        Self::resolve_with(cli, &file)
    }

    /// Same as [`Self::resolve`], with an already-loaded config file.
    pub fn resolve_with(cli: &CliOverrides, file: &ConfigFile) -> Result<Self> {
        let hours_per_day = pick(
            cli.hours_per_day,
            ENV_HOURS_PER_DAY,
            file.estimates.hours_per_day,
            DEFAULT_HOURS_PER_DAY,
        )?;
        let hourly_rate = pick(
            cli.hourly_rate,
            ENV_HOURLY_RATE,
            file.estimates.hourly_rate,
            DEFAULT_HOURLY_RATE,
        )?;
        let dependency_mode = pick(
            cli.dependency_mode,
            ENV_DEPENDENCY_MODE,
            file.validation.dependencies,
            DependencyMode::default(),
        )?;
        let bind = pick(
            cli.bind.clone(),
            ENV_BIND,
            file.server.bind.clone(),
            DEFAULT_BIND.to_string(),
        )?;
        let port = pick(cli.port, ENV_PORT, file.server.port, DEFAULT_PORT)?;

        Ok(Self {
            build: BuildOptions {
                hours_per_day,
                hourly_rate,
                dependency_mode,
            },
            capacity_hours: file
                .estimates
                .capacity_hours
                .unwrap_or(DEFAULT_CAPACITY_HOURS),
            bind,
            port,
        })
    }
}

/// First of: CLI value, parsed env var, file value, default.
fn pick<T>(cli: Option<T>, env_var: &str, file: Option<T>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = cli {
        return Ok(value);
    }
    if let Ok(raw) = std::env::var(env_var) {
        return raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {env_var}: {e}"));
    }
    Ok(file.unwrap_or(default))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
