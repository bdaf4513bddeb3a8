//! Configuration file support for modelsize.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `MODELSIZE_`, sections separated
//!    by `__`, e.g., `MODELSIZE_ESTIMATE__CONCURRENCY`)
//! 3. Config file (~/.config/modelsize/config.toml or ./modelsize.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [estimate]
//! min_context = 4096
//! finetune_context = 1024
//! concurrency = 4
//! timeout_secs = 30
//! gpu_memory = "legacy"  # or "from-weights"
//!
//! [http]
//! insecure = false  # skip TLS certificate verification
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use modelsize::GpuMemoryMode;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default estimate options.
    pub estimate: EstimateConfig,
    /// HTTP client options.
    pub http: HttpConfig,
}

/// Default estimate options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Context size reported for inference estimates.
    pub min_context: u64,
    /// Context size used for LoRA fine-tune estimates.
    pub finetune_context: u64,
    /// Maximum shards fetched at once.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// How GPU memory is derived before config enrichment.
    pub gpu_memory: GpuMemoryMode,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            min_context: 4096,
            finetune_context: 1024,
            concurrency: 1,
            timeout_secs: modelsize::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            gpu_memory: GpuMemoryMode::Legacy,
        }
    }
}

impl EstimateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP client options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Accept invalid TLS certificates.
    pub insecure: bool,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/modelsize/config.toml)
    /// 3. Local config file (./modelsize.toml)
    /// 4. Environment variables with MODELSIZE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // Local config file (higher priority than XDG)
        let local_config = PathBuf::from("modelsize.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./modelsize.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., MODELSIZE_ESTIMATE__MIN_CONTEXT -> estimate.min_context
        builder = builder.add_source(
            Environment::with_prefix("MODELSIZE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "modelsize").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
