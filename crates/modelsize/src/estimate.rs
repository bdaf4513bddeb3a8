//! Model size estimation from remote safetensors shards.
//!
//! The [`Estimator`] reads only the header of each shard with HTTP range
//! requests: an 8-byte little-endian length prefix, then the JSON header it
//! announces. Tensor shapes and dtypes give the parameter count and the
//! weight size without downloading any tensor data.
//!
//! When a shard declares a header above [`MAX_HEADER_SIZE`], the whole call
//! switches to size-only accounting: every shard is probed with a one-byte
//! range request and the totals of their `Content-Range` headers are summed.
//!
//! # Example
//!
//! ```ignore
//! use modelsize::{EstimateOptions, Estimator};
//!
//! let estimator = Estimator::with_reqwest(timeout, false)?
//!     .with_options(EstimateOptions::default().concurrency(4));
//! let info = estimator.estimate_model_info(&urls, 4096).await?;
//! println!("{} params in {} GiB", info.total_params, info.model_weights_gb);
//! ```
//!
//! [`MAX_HEADER_SIZE`]: crate::safetensors::MAX_HEADER_SIZE

mod aggregate;
mod error;
mod guard;
mod options;
mod pool;
mod progress;
mod shard;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use url::Url;

use crate::http::HttpTransport;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::model_info::ModelInfo;
use aggregate::Accumulator;
use guard::CallGuard;
use shard::{ShardHeader, fetch_shard_header, probe_file_size};

pub use error::{EstimateError, short_error_message};
pub use options::{DEFAULT_REQUEST_TIMEOUT, EstimateOptions, GpuMemoryMode};
pub use progress::{EstimateProgress, ProgressCallback, emit};

/// Estimates model size from safetensors shards over HTTP.
pub struct Estimator {
    transport: Arc<dyn HttpTransport>,
    options: EstimateOptions,
    on_progress: Option<ProgressCallback>,
}

impl Estimator {
    /// Create an estimator over any transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            options: EstimateOptions::default(),
            on_progress: None,
        }
    }

    /// Create an estimator backed by reqwest.
    pub fn with_reqwest(timeout: Duration, insecure: bool) -> Result<Self, EstimateError> {
        let transport = ReqwestTransport::with_options(timeout, insecure)?;
        Ok(Self::new(Arc::new(transport)))
    }

    #[must_use]
    pub fn with_options(mut self, options: EstimateOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn options(&self) -> &EstimateOptions {
        &self.options
    }

    fn emit(&self, event: EstimateProgress) {
        emit(self.on_progress.as_ref(), event);
    }

    /// Estimate parameters, dtypes and memory for a sharded model.
    ///
    /// `urls` are the shards in order. `context_size` of the result is
    /// `min_context`; `batch_size` is always 1.
    pub async fn estimate_model_info<S: AsRef<str>>(
        &self,
        urls: &[S],
        min_context: u64,
    ) -> Result<ModelInfo, EstimateError> {
        let urls = validate_urls(urls)?;
        let guard = CallGuard::start(&self.options);
        guard.check()?;

        self.emit(EstimateProgress::Started {
            shards: urls.len(),
            concurrency: self.options.concurrency,
        });

        let info = if self.options.concurrency > 1 && urls.len() > 1 {
            self.accumulate_concurrent(&urls, min_context, &guard).await?
        } else {
            self.accumulate_sequential(&urls, min_context, &guard).await?
        };

        match info {
            Some(info) => {
                self.emit(EstimateProgress::Complete {
                    total_params: info.total_params,
                    model_weights_gb: info.model_weights_gb,
                    size_only: false,
                });
                Ok(info)
            }
            None => self.size_only(&urls, min_context, &guard).await,
        }
    }

    /// Estimate weight size from shard file sizes alone.
    ///
    /// Parameter, dtype and GPU memory fields stay zero.
    pub async fn estimate_without_parameters<S: AsRef<str>>(
        &self,
        urls: &[S],
        min_context: u64,
    ) -> Result<ModelInfo, EstimateError> {
        let urls = validate_urls(urls)?;
        let guard = CallGuard::start(&self.options);
        guard.check()?;

        self.emit(EstimateProgress::Started {
            shards: urls.len(),
            concurrency: self.options.concurrency,
        });
        self.size_only(&urls, min_context, &guard).await
    }

    /// Total size of one file in GiB.
    pub async fn file_size_gb(&self, url: &str) -> Result<f64, EstimateError> {
        let url = validate_url(url)?;
        let guard = CallGuard::start(&self.options);
        probe_file_size(self.transport.as_ref(), &url, &guard).await
    }

    /// Header path, one shard at a time. `None` means a header was too large.
    async fn accumulate_sequential(
        &self,
        urls: &[String],
        min_context: u64,
        guard: &CallGuard,
    ) -> Result<Option<ModelInfo>, EstimateError> {
        let mut acc = Accumulator::default();

        for (index, url) in urls.iter().enumerate() {
            self.emit(EstimateProgress::FetchingHeader {
                index,
                url: url.clone(),
            });

            match fetch_shard_header(self.transport.as_ref(), url, guard).await {
                Ok(header) => {
                    if !self.account(&mut acc, index, url, header) {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    self.shard_failed(index, url, &e);
                    return Err(e);
                }
            }
        }

        Ok(Some(acc.finish(min_context, self.options.gpu_memory)))
    }

    /// Header path through the worker pool.
    ///
    /// Results are walked in input order and the walk stops at the first
    /// oversized header, so the outcome matches the sequential path. Failures
    /// of shards after that point are ignored, and workers that have not
    /// started yet skip their requests.
    async fn accumulate_concurrent(
        &self,
        urls: &[String],
        min_context: u64,
        guard: &CallGuard,
    ) -> Result<Option<ModelInfo>, EstimateError> {
        for (index, url) in urls.iter().enumerate() {
            self.emit(EstimateProgress::FetchingHeader {
                index,
                url: url.clone(),
            });
        }

        let first_too_large = Arc::new(AtomicUsize::new(usize::MAX));
        let mut results = pool::fan_out(urls, self.options.concurrency, |index, url| {
            let transport = Arc::clone(&self.transport);
            let guard = guard.clone();
            let first_too_large = Arc::clone(&first_too_large);
            async move {
                if index > first_too_large.load(Ordering::Acquire) {
                    return Ok::<_, EstimateError>(None);
                }
                let header = fetch_shard_header(transport.as_ref(), &url, &guard).await?;
                if matches!(header, ShardHeader::TooLarge { .. }) {
                    first_too_large.fetch_min(index, Ordering::AcqRel);
                }
                Ok(Some(header))
            }
        })
        .await;

        let cutoff = results
            .iter()
            .position(|r| matches!(r, Ok(Some(ShardHeader::TooLarge { .. }))))
            .map_or(results.len(), |index| index + 1);
        results.truncate(cutoff);

        for (index, (url, result)) in urls.iter().zip(&results).enumerate() {
            if let Err(e) = result {
                self.shard_failed(index, url, e);
            }
        }
        let headers = pool::collect(results)?;

        let mut acc = Accumulator::default();
        for (index, (url, header)) in urls.iter().zip(headers).enumerate() {
            // Skipped shards all sit after the cutoff.
            let Some(header) = header else { continue };
            if !self.account(&mut acc, index, url, header) {
                return Ok(None);
            }
        }

        Ok(Some(acc.finish(min_context, self.options.gpu_memory)))
    }

    /// Add one shard to the totals. Returns false when the header was too large.
    fn account(&self, acc: &mut Accumulator, index: usize, url: &str, header: ShardHeader) -> bool {
        match header {
            ShardHeader::Parsed(header) => {
                let stats = acc.add_header(url, &header);
                self.emit(EstimateProgress::HeaderParsed {
                    index,
                    url: url.to_string(),
                    tensors: stats.tensors,
                    skipped: stats.skipped,
                    params: stats.params,
                });
                true
            }
            ShardHeader::TooLarge { length } => {
                self.emit(EstimateProgress::HeaderTooLarge {
                    index,
                    url: url.to_string(),
                    length,
                });
                tracing::info!(url, length, "Falling back to file size accounting");
                false
            }
        }
    }

    fn shard_failed(&self, index: usize, url: &str, error: &EstimateError) {
        tracing::debug!(url, error = %error, "Shard failed");
        self.emit(EstimateProgress::ShardFailed {
            index,
            url: url.to_string(),
            error: short_error_message(error),
        });
    }

    /// Size-only path: sum the probed size of every shard.
    async fn size_only(
        &self,
        urls: &[String],
        min_context: u64,
        guard: &CallGuard,
    ) -> Result<ModelInfo, EstimateError> {
        let sizes = if self.options.concurrency > 1 && urls.len() > 1 {
            for (index, url) in urls.iter().enumerate() {
                self.emit(EstimateProgress::ProbingSize {
                    index,
                    url: url.clone(),
                });
            }

            let results = pool::fan_out(urls, self.options.concurrency, |_, url| {
                let transport = Arc::clone(&self.transport);
                let guard = guard.clone();
                async move { probe_file_size(transport.as_ref(), &url, &guard).await }
            })
            .await;

            for (index, (url, result)) in urls.iter().zip(&results).enumerate() {
                match result {
                    Ok(size_gb) => self.emit(EstimateProgress::SizeProbed {
                        index,
                        url: url.clone(),
                        size_gb: *size_gb,
                    }),
                    Err(e) => self.shard_failed(index, url, e),
                }
            }
            pool::collect(results)?
        } else {
            let mut sizes = Vec::with_capacity(urls.len());
            for (index, url) in urls.iter().enumerate() {
                self.emit(EstimateProgress::ProbingSize {
                    index,
                    url: url.clone(),
                });
                match probe_file_size(self.transport.as_ref(), url, guard).await {
                    Ok(size_gb) => {
                        self.emit(EstimateProgress::SizeProbed {
                            index,
                            url: url.clone(),
                            size_gb,
                        });
                        sizes.push(size_gb);
                    }
                    Err(e) => {
                        self.shard_failed(index, url, &e);
                        return Err(e);
                    }
                }
            }
            sizes
        };

        let info = ModelInfo {
            model_weights_gb: sizes.iter().sum(),
            context_size: min_context,
            batch_size: 1,
            ..ModelInfo::default()
        };

        self.emit(EstimateProgress::Complete {
            total_params: 0,
            model_weights_gb: info.model_weights_gb,
            size_only: true,
        });
        Ok(info)
    }
}

/// Estimate a model with a default reqwest transport and default options.
pub async fn estimate_model_info<S: AsRef<str>>(
    urls: &[S],
    min_context: u64,
) -> Result<ModelInfo, EstimateError> {
    Estimator::with_reqwest(DEFAULT_REQUEST_TIMEOUT, false)?
        .estimate_model_info(urls, min_context)
        .await
}

fn validate_urls<S: AsRef<str>>(urls: &[S]) -> Result<Vec<String>, EstimateError> {
    urls.iter().map(|url| validate_url(url.as_ref())).collect()
}

fn validate_url(url: &str) -> Result<String, EstimateError> {
    let invalid = |reason: String| EstimateError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
