//! Configuration System
//!
//! Hierarchical configuration with per-field serde defaults, an optional
//! TOML file, and `ANCHORAGE_*` environment overrides layered on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::logging::LoggingConfig;
use crate::quality::QualityGate;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorageConfig {
    /// Session pacing and gating parameters.
    #[serde(default)]
    pub session: SessionConfig,

    /// Anchor management service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Local storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session pacing and quality-gate parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds to let tracking stabilize before accepting input.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f32,

    /// Retention period requested for hosted anchors, days.
    #[serde(default = "default_host_ttl_days")]
    pub host_ttl_days: u32,

    /// Minimum camera distance as a multiple of the indicator radius.
    #[serde(default = "default_min_distance_factor")]
    pub min_distance_factor: f32,

    /// Maximum camera distance for hosting, meters.
    #[serde(default = "default_max_hosting_distance")]
    pub max_hosting_distance: f32,

    /// Indicator radius on horizontal-up planes, meters.
    #[serde(default = "default_indicator_radius")]
    pub indicator_radius: f32,

    /// Indicator radius on vertical and inclined planes, meters.
    #[serde(default = "default_indicator_radius_steep")]
    pub indicator_radius_steep: f32,

    /// Tick interval for the CLI's simulated sessions, milliseconds.
    #[serde(default = "default_sim_tick_ms")]
    pub sim_tick_ms: u64,
}

fn default_warmup_secs() -> f32 {
    3.0
}

fn default_host_ttl_days() -> u32 {
    1
}

fn default_min_distance_factor() -> f32 {
    1.5
}

fn default_max_hosting_distance() -> f32 {
    10.0
}

fn default_indicator_radius() -> f32 {
    0.25
}

fn default_indicator_radius_steep() -> f32 {
    0.35
}

fn default_sim_tick_ms() -> u64 {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warmup_secs: default_warmup_secs(),
            host_ttl_days: default_host_ttl_days(),
            min_distance_factor: default_min_distance_factor(),
            max_hosting_distance: default_max_hosting_distance(),
            indicator_radius: default_indicator_radius(),
            indicator_radius_steep: default_indicator_radius_steep(),
            sim_tick_ms: default_sim_tick_ms(),
        }
    }
}

impl SessionConfig {
    /// Gate limits derived from this configuration.
    pub fn gate(&self) -> QualityGate {
        QualityGate {
            min_distance_factor: self.min_distance_factor,
            max_distance: self.max_hosting_distance,
        }
    }
}

/// Anchor management service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the anchor management API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token or API key. `None` disables the management commands.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout, seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://arcore.googleapis.com/v1beta2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the data directory. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the history database path for the given service endpoint.
    ///
    /// Histories are namespaced per endpoint so pointing the CLI at a
    /// different service never mixes record sequences:
    /// `<data_dir>/services/<endpoint-hash>/history`.
    pub fn history_path(&self, endpoint: &str) -> Result<PathBuf, SessionError> {
        let base = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("", "", "anchorage")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    SessionError::Config("cannot determine a platform data directory".to_string())
                })?,
        };
        let digest = blake3::hash(endpoint.as_bytes());
        let namespace = hex::encode(&digest.as_bytes()[..8]);
        Ok(base.join("services").join(namespace).join("history"))
    }
}

/// Loads configuration from defaults, an optional file, and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with precedence: defaults < file < `ANCHORAGE_*` environment.
    ///
    /// When `path` is `None`, `anchorage.toml` in the working directory is
    /// used if present; a missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<AnchorageConfig, SessionError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AnchorageConfig::default())?);

        match path {
            Some(file) => {
                builder = builder.add_source(config::File::from(file));
            }
            None => {
                builder = builder
                    .add_source(config::File::with_name("anchorage").required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ANCHORAGE")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}
