use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default request timeout for the reqwest transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How `mini_gpu_memory_gb` is derived from header accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuMemoryMode {
    /// Reproduce the established behavior: the running byte total feeding the
    /// estimate is never accumulated, so the value always floors to 1 GiB.
    /// Callers refine it from `config.json` via
    /// [`crate::model_config::apply_model_config`].
    #[default]
    Legacy,
    /// `max(truncate(weight bytes / GiB), 1)`.
    FromWeights,
}

impl GpuMemoryMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::FromWeights => "from-weights",
        }
    }
}

impl fmt::Display for GpuMemoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpuMemoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "from-weights" | "from_weights" => Ok(Self::FromWeights),
            other => Err(format!("unknown GPU memory mode: {other}")),
        }
    }
}

/// Options for an estimation call.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    /// How to derive `mini_gpu_memory_gb`.
    pub gpu_memory: GpuMemoryMode,
    /// Maximum shards fetched at once. `1` keeps the strictly sequential
    /// order, stopping at the first oversized header.
    pub concurrency: usize,
    /// Upper bound on the wall-clock time of the whole call.
    pub deadline: Option<Duration>,
    /// Raised by the caller to stop before the next request.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            gpu_memory: GpuMemoryMode::default(),
            concurrency: 1,
            deadline: None,
            shutdown_flag: None,
        }
    }
}

impl EstimateOptions {
    #[must_use]
    pub fn gpu_memory(mut self, mode: GpuMemoryMode) -> Self {
        self.gpu_memory = mode;
        self
    }

    /// Set the concurrency. Zero is treated as one.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the shutdown flag for graceful shutdown.
    #[must_use]
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_and_legacy() {
        let options = EstimateOptions::default();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.gpu_memory, GpuMemoryMode::Legacy);
        assert!(options.deadline.is_none());
        assert!(options.shutdown_flag.is_none());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(EstimateOptions::default().concurrency(0).concurrency, 1);
        assert_eq!(EstimateOptions::default().concurrency(8).concurrency, 8);
    }

    #[test]
    fn gpu_memory_mode_parses_both_spellings() {
        assert_eq!("legacy".parse(), Ok(GpuMemoryMode::Legacy));
        assert_eq!("From-Weights".parse(), Ok(GpuMemoryMode::FromWeights));
        assert_eq!("from_weights".parse(), Ok(GpuMemoryMode::FromWeights));
        assert!("weights".parse::<GpuMemoryMode>().is_err());
        assert_eq!(GpuMemoryMode::FromWeights.to_string(), "from-weights");
    }
}
