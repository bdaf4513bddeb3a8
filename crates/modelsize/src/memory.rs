//! Closed-form GPU memory estimators.
//!
//! These are pure functions used for capacity planning. Sizes are returned
//! in GiB.

/// Bytes in one GiB.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Fixed overhead added to every fine-tune estimate, in GiB.
pub const FINETUNE_OVERHEAD_GB: f64 = 1.0;

/// Upper bound for the share of parameters trained by LoRA.
pub const MAX_LORA_RATIO: f64 = 0.05;

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a byte count to GiB.
#[must_use]
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Extra runtime overhead for a model of `model_size`, as 5% of its size.
#[must_use]
pub fn extra_overhead(model_size: u64) -> f64 {
    model_size as f64 * 0.05
}

/// Activation memory for one forward pass.
///
/// `batch · seq · hidden · (34 + 5 · seq · heads / hidden) · bytes_per_param`.
/// The layer count does not enter the formula. Returns 0 for a zero hidden
/// size.
#[must_use]
pub fn activation_memory_gb(
    batch_size: u64,
    seq_length: u64,
    _num_layers: u64,
    hidden_size: u64,
    num_heads: u64,
    bytes_per_param: u64,
) -> f64 {
    if hidden_size == 0 {
        return 0.0;
    }
    let batch = batch_size as f64;
    let seq = seq_length as f64;
    let hidden = hidden_size as f64;
    let heads = num_heads as f64;

    let activation_factor = 34.0 + (5.0 * seq * heads) / hidden;
    let total = batch * seq * hidden * activation_factor * bytes_per_param as f64;
    total / GIB as f64
}

/// KV cache size: `2 · batch · context · layers · hidden · bytes_per_param`.
///
/// The division by GiB happens in integer arithmetic, so the result is
/// truncated to whole GiB before conversion.
#[must_use]
pub fn kv_cache_size_gb(
    context_size: u64,
    batch_size: u64,
    hidden_size: u64,
    num_layers: u64,
    bytes_per_param: u64,
) -> f64 {
    let bytes = 2u64
        .saturating_mul(batch_size)
        .saturating_mul(context_size)
        .saturating_mul(num_layers)
        .saturating_mul(hidden_size)
        .saturating_mul(bytes_per_param);
    (bytes / GIB) as f64
}

/// Inputs for [`lora_finetune_memory_gb`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinetuneInputs {
    pub model_weights_gb: f64,
    pub total_params: f64,
    pub batch_size: u64,
    pub context_size: u64,
    pub hidden_size: u64,
    pub num_layers: u64,
    pub num_heads: u64,
    pub bytes_per_param: u64,
    pub lora_rank: u64,
}

/// GPU memory needed to fine-tune a model with LoRA.
///
/// The trained share of parameters is `min(rank / 1000, 0.05)`. Gradients
/// match the LoRA parameters and the optimizer keeps two states per
/// parameter. Activations and a fixed 1 GiB overhead are added on top of the
/// frozen weights. Rounded to two decimals.
#[must_use]
pub fn lora_finetune_memory_gb(inputs: &FinetuneInputs) -> f64 {
    let lora_ratio = (inputs.lora_rank as f64 / 1000.0).min(MAX_LORA_RATIO);
    let lora_params_gb =
        inputs.total_params * lora_ratio * inputs.bytes_per_param as f64 / GIB as f64;
    let gradients_gb = lora_params_gb;
    let optimizer_state_gb = lora_params_gb * 2.0;
    let activation_gb = activation_memory_gb(
        inputs.batch_size,
        inputs.context_size,
        inputs.num_layers,
        inputs.hidden_size,
        inputs.num_heads,
        inputs.bytes_per_param,
    );

    round2(
        inputs.model_weights_gb
            + lora_params_gb
            + gradients_gb
            + optimizer_state_gb
            + activation_gb
            + FINETUNE_OVERHEAD_GB,
    )
}
