//! Progress reporting for estimate operations.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): Progress bars using indicatif
//! - Logging mode (non-TTY): Structured logging using tracing
//!
//! Interactive mode shows one bar for shard headers and, when a header is
//! too large to fetch, a second bar for the file size probes.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use modelsize::{EstimateProgress, ProgressCallback};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: EstimateProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Clear all progress bars (interactive mode only).
    pub fn clear(&self) {
        if let Self::Interactive(r) = self {
            r.clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Last path segment of a shard URL, for compact display.
pub(crate) fn shard_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_name_is_last_path_segment() {
        assert_eq!(
            shard_name("https://hub.example.com/org/model/resolve/main/model-00001-of-00004.safetensors"),
            "model-00001-of-00004.safetensors"
        );
        assert_eq!(
            shard_name("https://hub.example.com/model.safetensors?download=true"),
            "model.safetensors"
        );
        assert_eq!(shard_name("model.safetensors"), "model.safetensors");
        assert_eq!(shard_name(""), "");
    }

    #[test]
    fn callback_forwards_to_logging_reporter() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        callback(EstimateProgress::Started {
            shards: 2,
            concurrency: 1,
        });
        reporter.clear();
    }

    #[test]
    fn interactive_reporter_handles_a_full_fallback_sequence() {
        let reporter = ProgressReporter::Interactive(InteractiveReporter::hidden());
        let url = "https://hub.example.com/model.safetensors".to_string();

        reporter.handle(EstimateProgress::Started {
            shards: 1,
            concurrency: 1,
        });
        reporter.handle(EstimateProgress::FetchingHeader {
            index: 0,
            url: url.clone(),
        });
        reporter.handle(EstimateProgress::HeaderTooLarge {
            index: 0,
            url: url.clone(),
            length: 2_000_000,
        });
        reporter.handle(EstimateProgress::ProbingSize {
            index: 0,
            url: url.clone(),
        });
        reporter.handle(EstimateProgress::SizeProbed {
            index: 0,
            url,
            size_gb: 4.5,
        });
        reporter.handle(EstimateProgress::Complete {
            total_params: 0,
            model_weights_gb: 4.5,
            size_only: true,
        });
        reporter.clear();
    }
}
