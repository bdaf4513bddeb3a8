//! Progress reporting types for estimation calls.

/// Progress events emitted while estimating a model.
///
/// `index` is the zero-based position of the shard in the input list.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EstimateProgress {
    /// Starting a call.
    Started {
        /// Number of shards in the request.
        shards: usize,
        /// Number of shards fetched at once.
        concurrency: usize,
    },

    /// Requesting the header of a shard.
    FetchingHeader { index: usize, url: String },

    /// A shard header was decoded and accounted.
    HeaderParsed {
        index: usize,
        url: String,
        /// Tensors accounted from this shard.
        tensors: usize,
        /// Tensors skipped because of a malformed entry.
        skipped: usize,
        /// Parameters contributed by this shard.
        params: u64,
    },

    /// A shard header is above the fetch limit; the call switches to
    /// size-only accounting for every shard.
    HeaderTooLarge {
        index: usize,
        url: String,
        /// Declared header length in bytes.
        length: u64,
    },

    /// Probing a shard's total size.
    ProbingSize { index: usize, url: String },

    /// A shard's size is known.
    SizeProbed {
        index: usize,
        url: String,
        size_gb: f64,
    },

    /// A shard failed. The call will return an error.
    ShardFailed {
        index: usize,
        url: String,
        error: String,
    },

    /// The call finished.
    Complete {
        total_params: u64,
        model_weights_gb: f64,
        /// True when the size-only path produced the result.
        size_only: bool,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(EstimateProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: EstimateProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
