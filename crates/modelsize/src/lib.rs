//! Modelsize - estimate the size and GPU memory of a safetensors model.
//!
//! This library reads the headers of remote safetensors shards with HTTP
//! range requests and turns tensor shapes and dtypes into parameter counts,
//! weight size, and GPU memory estimates. No tensor data is downloaded.
//!
//! # Example
//!
//! ```ignore
//! use modelsize::{Estimator, model_config};
//!
//! let estimator = Estimator::with_reqwest(timeout, false)?;
//! let mut info = estimator.estimate_model_info(&shard_urls, 4096).await?;
//!
//! // Refine GPU memory from the model's config.json
//! let config = model_config::fetch_json_document(&transport, &config_url).await?;
//! model_config::apply_model_config(&mut info, &config, 1024);
//! ```

pub mod dtype;
pub mod estimate;
pub mod http;
pub mod memory;
pub mod model_config;
pub mod model_info;
pub mod range;
pub mod safetensors;

pub use estimate::{
    DEFAULT_REQUEST_TIMEOUT, EstimateError, EstimateOptions, EstimateProgress, Estimator,
    GpuMemoryMode, ProgressCallback, estimate_model_info, short_error_message,
};
pub use http::reqwest_transport::ReqwestTransport;
pub use http::{HttpError, HttpTransport};
pub use model_config::{ConfigError, ModelConfig, ModelIndex};
pub use model_info::ModelInfo;
