//! Error types for estimation calls.

use thiserror::Error;

use crate::http::HttpError;
use crate::range::FetchError;

/// Errors that abort an estimation call.
///
/// An oversized header is not an error: it switches the call to size-only
/// accounting.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The URL is not an absolute `http://` or `https://` URL.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] HttpError),

    /// A range request failed.
    #[error("failed to fetch metadata: {source}, url: {url}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The header bytes were not a JSON object.
    #[error("failed to decode safetensors header: {source}, url: {url}")]
    Header {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The shutdown flag was raised before the call finished.
    #[error("estimation cancelled")]
    Cancelled,

    /// The call deadline passed while waiting on the network.
    #[error("deadline exceeded while fetching {url}")]
    DeadlineExceeded { url: String },

    /// A worker task panicked or was aborted.
    #[error("shard worker failed: {0}")]
    Worker(String),

    /// More than one shard failed in concurrent mode.
    #[error("{failed} of {total} shards failed", failed = .errors.len())]
    Shards {
        total: usize,
        errors: Vec<EstimateError>,
    },
}

impl EstimateError {
    pub(crate) fn fetch(url: &str, source: FetchError) -> Self {
        Self::Fetch {
            url: url.to_string(),
            source,
        }
    }

    /// The shard URL the error is about, if it concerns a single shard.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Fetch { url, .. }
            | Self::Header { url, .. }
            | Self::DeadlineExceeded { url } => Some(url),
            Self::Client(_) | Self::Cancelled | Self::Worker(_) | Self::Shards { .. } => None,
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &EstimateError) -> String {
    match err {
        EstimateError::InvalidUrl { .. } => "Invalid URL".to_string(),
        EstimateError::Client(_) => "Client error".to_string(),
        EstimateError::Fetch { source, .. } => match source {
            FetchError::Transport(_) => "Network error".to_string(),
            FetchError::UnexpectedStatus { status, .. } => format!("HTTP {}", status),
            FetchError::ShortBody { .. } => "Short response".to_string(),
            FetchError::MissingContentRange | FetchError::InvalidContentRange(_) => {
                "Bad Content-Range".to_string()
            }
        },
        EstimateError::Header { .. } => "Header JSON error".to_string(),
        EstimateError::Cancelled => "Cancelled".to_string(),
        EstimateError::DeadlineExceeded { .. } => "Deadline exceeded".to_string(),
        EstimateError::Worker(_) => "Worker failed".to_string(),
        EstimateError::Shards { total, errors } => {
            format!("{}/{} shards failed", errors.len(), total)
        }
    }
}
