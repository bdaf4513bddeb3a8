//! Network reads for a single shard.

use super::error::EstimateError;
use super::guard::CallGuard;
use crate::http::HttpTransport;
use crate::memory::bytes_to_gb;
use crate::range::{ByteRange, FetchError, content_range};
use crate::safetensors::{HEADER_LENGTH_BYTES, MAX_HEADER_SIZE, SafetensorsHeader, header_length};

/// Outcome of reading one shard's header.
#[derive(Debug)]
pub(crate) enum ShardHeader {
    Parsed(SafetensorsHeader),
    /// The declared header length is above [`MAX_HEADER_SIZE`].
    TooLarge { length: u64 },
}

/// Read the length prefix, then the JSON header, of a safetensors shard.
pub(crate) async fn fetch_shard_header(
    transport: &dyn HttpTransport,
    url: &str,
    guard: &CallGuard,
) -> Result<ShardHeader, EstimateError> {
    let prefix_range = ByteRange::new(0, HEADER_LENGTH_BYTES as u64 - 1);
    let prefix = guard.fetch(transport, url, prefix_range).await?;

    let length = header_length(&prefix.body).ok_or_else(|| {
        EstimateError::fetch(
            url,
            FetchError::ShortBody {
                expected: prefix_range.byte_count(),
                actual: prefix.body.len(),
            },
        )
    })?;

    if length > MAX_HEADER_SIZE {
        tracing::warn!(
            url,
            length,
            max = MAX_HEADER_SIZE,
            "Safetensors header exceeds maximum allowed size"
        );
        return Ok(ShardHeader::TooLarge { length });
    }

    // A zero-length header cannot be requested as a range and is not valid JSON.
    let body = if length == 0 {
        Vec::new()
    } else {
        let header_range = ByteRange::new(HEADER_LENGTH_BYTES as u64, 7 + length);
        let body = guard.fetch(transport, url, header_range).await?.body;
        if (body.len() as u64) < header_range.byte_count() {
            return Err(EstimateError::fetch(
                url,
                FetchError::ShortBody {
                    expected: header_range.byte_count(),
                    actual: body.len(),
                },
            ));
        }
        body
    };

    let header = SafetensorsHeader::from_slice(&body).map_err(|source| EstimateError::Header {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!(url, length, tensors = header.tensor_count(), "Fetched safetensors header");
    Ok(ShardHeader::Parsed(header))
}

/// Total size of the file at `url` in GiB, read from the `Content-Range` of a
/// single-byte range request.
pub(crate) async fn probe_file_size(
    transport: &dyn HttpTransport,
    url: &str,
    guard: &CallGuard,
) -> Result<f64, EstimateError> {
    let response = guard.fetch(transport, url, ByteRange::new(0, 0)).await?;
    let range = content_range(&response).map_err(|source| EstimateError::fetch(url, source))?;

    tracing::debug!(url, total = range.total, "Probed file size");
    Ok(bytes_to_gb(range.total))
}
