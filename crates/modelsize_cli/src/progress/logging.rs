use modelsize::EstimateProgress;

use super::shard_name;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: EstimateProgress) {
        match event {
            EstimateProgress::Started {
                shards,
                concurrency,
            } => {
                tracing::info!(shards, concurrency, "Estimating model");
            }

            EstimateProgress::FetchingHeader { index, url } => {
                tracing::debug!(index, shard = shard_name(&url), "Fetching header");
            }

            EstimateProgress::HeaderParsed {
                index,
                url,
                tensors,
                skipped,
                params,
            } => {
                tracing::info!(index, shard = shard_name(&url), tensors, skipped, params, "Parsed header");
            }

            EstimateProgress::HeaderTooLarge { index, url, length } => {
                tracing::warn!(
                    index,
                    shard = shard_name(&url),
                    length,
                    "Header too large, falling back to file sizes"
                );
            }

            EstimateProgress::ProbingSize { index, url } => {
                tracing::debug!(index, shard = shard_name(&url), "Probing size");
            }

            EstimateProgress::SizeProbed {
                index,
                url,
                size_gb,
            } => {
                tracing::info!(index, shard = shard_name(&url), size_gb, "Probed size");
            }

            EstimateProgress::ShardFailed { index, url, error } => {
                tracing::warn!(index, url = %url, error = %error, "Shard failed");
            }

            EstimateProgress::Complete {
                total_params,
                model_weights_gb,
                size_only,
            } => {
                tracing::info!(total_params, model_weights_gb, size_only, "Estimate complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
