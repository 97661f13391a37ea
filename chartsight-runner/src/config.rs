//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! [analysis.weights]
//! patterns = 0.2
//!
//! [remote]
//! timeout_ms = 30000
//! timeframe = "5m"
//!
//! [capture]
//! interval_secs = 30
//!
//! [store]
//! path = "decisions.jsonl"
//! ```
//!
//! Every table is optional; missing keys fall back to their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chartsight_core::AnalysisConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid analysis config: {0}")]
    Analysis(#[from] chartsight_core::ConfigError),
    #[error("{name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Hard deadline for the remote analyzer before falling back.
    pub timeout_ms: u64,
    /// Chart timeframe label forwarded to the remote analyzer.
    pub timeframe: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            timeframe: "1m".into(),
        }
    }
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub interval_secs: u64,
    /// Floor for `interval_secs`, including runtime interval updates.
    pub min_interval_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            min_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("decisions.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub analysis: AnalysisConfig,
    pub remote: RemoteSettings,
    pub capture: CaptureSettings,
    pub store: StoreSettings,
}

impl RunnerConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        if self.remote.timeout_ms == 0 {
            return Err(invalid("remote.timeout_ms", "must be > 0"));
        }
        if self.capture.min_interval_secs == 0 {
            return Err(invalid("capture.min_interval_secs", "must be > 0"));
        }
        if self.capture.interval_secs < self.capture.min_interval_secs {
            return Err(invalid(
                "capture.interval_secs",
                "must be >= capture.min_interval_secs",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
