use serde::{Deserialize, Serialize};

/// Size and memory estimate for a model.
///
/// Produced by [`crate::Estimator`] and optionally enriched with
/// [`crate::model_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Sum of the parameter counts of every tensor in every shard.
    pub total_params: u64,
    /// `total_params / 1e9`, rounded to two decimals.
    pub params_billions: f64,
    /// Space-joined dtype labels in first-seen order, e.g. `"BF16 F32"`.
    pub tensor_type: String,
    /// Estimated weight size in GiB.
    pub model_weights_gb: f64,
    /// Estimated minimum GPU memory for inference in GiB.
    pub mini_gpu_memory_gb: f64,
    /// Estimated minimum GPU memory for LoRA fine-tuning in GiB.
    #[serde(default)]
    pub mini_gpu_finetune_gb: f64,
    pub context_size: u64,
    pub batch_size: u64,
    /// Width of the last accounted tensor's dtype.
    pub bytes_per_param: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub hidden_size: u64,
    #[serde(default)]
    pub num_hidden_layers: u64,
    #[serde(default)]
    pub num_attention_heads: u64,
}

impl ModelInfo {
    /// Whether parameter-level accounting was possible.
    #[must_use]
    pub fn has_parameters(&self) -> bool {
        self.total_params > 0
    }
}
