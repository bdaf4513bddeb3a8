//! Enrichment of a [`ModelInfo`] from the model's `config.json` and
//! `model_index.json` documents.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::{HttpError, HttpRequest, HttpTransport};
use crate::memory::{
    FinetuneInputs, activation_memory_gb, kv_cache_size_gb, lora_finetune_memory_gb, round2,
};
use crate::model_info::ModelInfo;

/// LoRA rank assumed for fine-tune estimates.
pub const DEFAULT_LORA_RANK: u64 = 16;

/// Batch size assumed for fine-tune estimates.
pub const DEFAULT_FINETUNE_BATCH_SIZE: u64 = 16;

/// The fields of `config.json` used for memory estimates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub hidden_size: u64,
    #[serde(default)]
    pub num_hidden_layers: u64,
    #[serde(default)]
    pub num_attention_heads: u64,
}

/// The fields of `model_index.json` used to label a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelIndex {
    #[serde(rename = "_class_name", default)]
    pub class_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// GET a JSON document and decode it.
pub async fn fetch_json_document<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    url: &str,
) -> Result<T, ConfigError> {
    let response = transport
        .send(HttpRequest::get(url))
        .await
        .map_err(|source| ConfigError::Fetch {
            url: url.to_string(),
            source,
        })?;

    if !(200..300).contains(&response.status) {
        return Err(ConfigError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }

    serde_json::from_slice(&response.body).map_err(|source| ConfigError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Fill architecture fields and recompute GPU memory from `config`.
///
/// The architecture is the first entry of `architectures`, when there is
/// one. Inference memory is KV cache plus weights plus activations at the
/// info's context and batch size. Fine-tune memory assumes LoRA rank
/// [`DEFAULT_LORA_RANK`] at batch [`DEFAULT_FINETUNE_BATCH_SIZE`] and
/// `finetune_context` tokens. A zero hidden size leaves both memory fields
/// untouched.
pub fn apply_model_config(info: &mut ModelInfo, config: &ModelConfig, finetune_context: u64) {
    if let Some(architecture) = config.architectures.first() {
        info.architecture = Some(architecture.clone());
    }
    if !config.model_type.is_empty() {
        info.model_type = Some(config.model_type.clone());
    }
    info.hidden_size = config.hidden_size;
    info.num_hidden_layers = config.num_hidden_layers;
    info.num_attention_heads = config.num_attention_heads;

    let architecture = config
        .architectures
        .first()
        .map(String::as_str)
        .unwrap_or_default();
    if config.hidden_size == 0 {
        tracing::debug!(architecture, "Model config has no hidden size");
        return;
    }

    let kv_cache = kv_cache_size_gb(
        info.context_size,
        info.batch_size,
        config.hidden_size,
        config.num_hidden_layers,
        info.bytes_per_param,
    );
    let activation = activation_memory_gb(
        info.batch_size,
        info.context_size,
        config.num_hidden_layers,
        config.hidden_size,
        config.num_attention_heads,
        info.bytes_per_param,
    );
    info.mini_gpu_memory_gb = round2(kv_cache + info.model_weights_gb + activation);

    info.mini_gpu_finetune_gb = lora_finetune_memory_gb(&FinetuneInputs {
        model_weights_gb: info.model_weights_gb,
        total_params: info.params_billions * 1e9,
        batch_size: DEFAULT_FINETUNE_BATCH_SIZE,
        context_size: finetune_context,
        hidden_size: config.hidden_size,
        num_layers: config.num_hidden_layers,
        num_heads: config.num_attention_heads,
        bytes_per_param: info.bytes_per_param,
        lora_rank: DEFAULT_LORA_RANK,
    });

    tracing::debug!(
        architecture,
        kv_cache,
        activation,
        inference_gb = info.mini_gpu_memory_gb,
        finetune_gb = info.mini_gpu_finetune_gb,
        "Applied model config"
    );
}

/// Label a pipeline from its `model_index.json`.
pub fn apply_model_index(info: &mut ModelInfo, index: &ModelIndex) {
    if !index.class_name.is_empty() {
        info.class_name = Some(index.class_name.clone());
    }
}
