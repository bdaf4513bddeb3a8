//! HTTP range requests.
//!
//! Every network read in this crate is a `GET` with a `Range` header that
//! must be answered with `206 Partial Content`. Servers that ignore the
//! header and reply `200 OK` with the whole file are treated as failures.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};

/// Status code required for every range response.
pub const PARTIAL_CONTENT: u16 = 206;

/// An inclusive byte range, as written in a `Range: bytes=start-end` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create an inclusive range. `end` must not be smaller than `start`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "byte range end before start");
        Self { start, end }
    }

    /// Number of bytes covered by the range.
    #[must_use]
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A parsed `Content-Range: bytes start-end/total` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl FromStr for ContentRange {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FetchError::InvalidContentRange(s.to_string());

        let rest = s.trim().strip_prefix("bytes").ok_or_else(invalid)?.trim();
        let (span, total) = rest.split_once('/').ok_or_else(invalid)?;
        let (start, end) = span.split_once('-').ok_or_else(invalid)?;

        let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
        let end = end.trim().parse::<u64>().map_err(|_| invalid())?;
        let total = total.trim().parse::<u64>().map_err(|_| invalid())?;

        if total == 0 {
            return Err(invalid());
        }

        Ok(Self { start, end, total })
    }
}

/// Errors for a single range request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport could not complete the request.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The server answered with something other than 206.
    #[error("remote server does not support range request {range}, status code: {status}")]
    UnexpectedStatus { status: u16, range: ByteRange },

    /// The body was shorter than the bytes the caller needs.
    #[error("short range response: expected {expected} bytes, got {actual}")]
    ShortBody { expected: u64, actual: usize },

    /// The response carried no `Content-Range` header.
    #[error("empty Content-Range")]
    MissingContentRange,

    /// The `Content-Range` header could not be parsed.
    #[error("can not parse Content-Range: {0}")]
    InvalidContentRange(String),
}

/// Fetch `range` of `url` and require a partial-content answer.
pub async fn fetch_range(
    transport: &dyn HttpTransport,
    url: &str,
    range: ByteRange,
) -> Result<HttpResponse, FetchError> {
    let request = HttpRequest::get(url).with_header("Range", range.header_value());

    tracing::trace!(url, range = %range, "Sending range request");
    let response = transport.send(request).await?;

    if response.status != PARTIAL_CONTENT {
        return Err(FetchError::UnexpectedStatus {
            status: response.status,
            range,
        });
    }

    Ok(response)
}

/// Read the `Content-Range` header of a range response.
pub fn content_range(response: &HttpResponse) -> Result<ContentRange, FetchError> {
    match response.header("content-range") {
        Some(value) if !value.trim().is_empty() => value.parse(),
        _ => Err(FetchError::MissingContentRange),
    }
}
