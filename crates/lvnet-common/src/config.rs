//! ---
//! lvnet_section: "01-core-functionality"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "TOML application configuration with environment override."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use lvnet_engine::EngineSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_iterations() -> usize {
    1000
}

fn default_reports_directory() -> PathBuf {
    PathBuf::from("target/reports")
}

/// Configuration shared by the lvnet binaries. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "LVNET_CONFIG";

    /// Load configuration from disk, respecting the `LVNET_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        let Some(source) = Self::resolve_source(candidates) else {
            return Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        };
        let config = Self::from_path(source.clone())?;
        Ok(LoadedAppConfig { config, source })
    }

    /// Like [`AppConfig::load`], but falls back to defaults when no file exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        match Self::resolve_source(candidates) {
            Some(source) => Self::from_path(source),
            None => {
                debug!("no configuration file present, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `LVNET_CONFIG` when set, otherwise the first candidate that exists.
    fn resolve_source<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Some(PathBuf::from(env_path));
            }
        }
        candidates
            .iter()
            .map(|candidate| candidate.as_ref())
            .find(|candidate| candidate.exists())
            .map(Path::to_path_buf)
    }

    pub fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Engine settings with the `[monte_carlo]` seed override applied.
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = self.engine.clone();
        if let Some(seed) = self.monte_carlo.seed {
            settings.constants.monte_carlo_seed = seed;
        }
        settings
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.monte_carlo.iterations == 0 {
            return Err(anyhow!("monte_carlo.iterations must be at least 1"));
        }
        let constants = &self.engine.constants;
        if !constants.line_voltage_kv.is_finite() || constants.line_voltage_kv <= 0.0 {
            return Err(anyhow!(
                "engine.constants.line_voltage_kv must be positive, got {}",
                constants.line_voltage_kv
            ));
        }
        if constants.source_id.trim().is_empty() {
            return Err(anyhow!("engine.constants.source_id must not be empty"));
        }
        if constants.max_optimizer_iterations == 0 {
            return Err(anyhow!(
                "engine.constants.max_optimizer_iterations must be at least 1"
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily rolling JSON log under `directory`.
    #[serde(default)]
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Overrides `engine.constants.monte_carlo_seed` when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_directory")]
    pub directory: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_directory(),
        }
    }
}
