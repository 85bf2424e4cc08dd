//! Configuration for the ingestion pipeline.

use std::time::Duration;

use bugfy_store::StoreConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{IngestError, IngestResult};

/// Default deadline applied to each ingestion or query, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IngestConfig {
    /// Pipeline behaviour.
    #[serde(default)]
    pub ingest: PipelineConfig,

    /// Storage backend.
    #[serde(default)]
    pub store: StoreConfig,
}

impl IngestConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `bugfy.toml` in the current directory (if present)
    /// 3. Environment variables with `BUGFY_` prefix
    pub fn load() -> IngestResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file("bugfy.toml")))
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> IngestResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn from_figment(figment: Figment) -> IngestResult<Self> {
        figment
            .merge(Env::prefixed("BUGFY_").split("__"))
            .extract()
            .map_err(|e| IngestError::Config(e.to_string()))
    }
}

/// Pipeline behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Deadline for a whole ingestion or query, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fail the ingestion call when grouping fails.
    ///
    /// The error event is stored either way. When `false`, grouping failures
    /// are logged and the stored event is returned.
    #[serde(default = "default_fail_on_grouping_error")]
    pub fail_on_grouping_error: bool,
}

impl PipelineConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_fail_on_grouping_error() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            fail_on_grouping_error: default_fail_on_grouping_error(),
        }
    }
}
