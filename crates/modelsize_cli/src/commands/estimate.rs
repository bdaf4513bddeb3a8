use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use modelsize::model_config::{self, ModelConfig, ModelIndex};
use modelsize::{
    EstimateOptions, Estimator, GpuMemoryMode, HttpTransport, ModelInfo, ReqwestTransport,
    short_error_message,
};

use crate::commands::{FieldRow, OutputFormat, render};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Options for the estimate command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EstimateArgs {
    /// Safetensors shard URL(s), in order
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Context size for the inference estimate (default from config or 4096)
    #[arg(short = 'x', long)]
    pub min_context: Option<u64>,

    /// URL of the model's config.json, used to refine GPU memory
    #[arg(short = 'C', long)]
    pub config_url: Option<String>,

    /// URL of a diffusers model_index.json, used to read the pipeline class
    #[arg(short = 'I', long)]
    pub model_index_url: Option<String>,

    /// Context size for the fine-tune estimate (default from config or 1024)
    #[arg(short = 'f', long)]
    pub finetune_context: Option<u64>,

    /// Maximum shards fetched at once (default from config or 1)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds (default from config or 30)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Give up on the whole estimate after this many seconds
    #[arg(short = 'd', long)]
    pub deadline: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// How GPU memory is derived before config.json refinement
    #[arg(short = 'g', long)]
    pub gpu_memory: Option<GpuMemoryMode>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl EstimateArgs {
    fn options(&self, config: &Config, shutdown_flag: Arc<AtomicBool>) -> EstimateOptions {
        let mut options = EstimateOptions::default()
            .gpu_memory(self.gpu_memory.unwrap_or(config.estimate.gpu_memory))
            .concurrency(self.concurrency.unwrap_or(config.estimate.concurrency))
            .shutdown_flag(shutdown_flag);
        if let Some(secs) = self.deadline {
            options = options.deadline(Duration::from_secs(secs));
        }
        options
    }

    fn timeout(&self, config: &Config) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.estimate.timeout())
    }
}

/// Handle the estimate command.
pub(crate) async fn handle_estimate(
    args: EstimateArgs,
    config: &Config,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let min_context = args.min_context.unwrap_or(config.estimate.min_context);
    let finetune_context = args
        .finetune_context
        .unwrap_or(config.estimate.finetune_context);
    let insecure = args.insecure || config.http.insecure;

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::with_options(
        args.timeout(config),
        insecure,
    )?);

    let reporter = Arc::new(ProgressReporter::new());
    let estimator = Estimator::new(Arc::clone(&transport))
        .with_options(args.options(config, shutdown_flag))
        .with_progress(reporter.as_callback());

    let result = estimator.estimate_model_info(&args.urls, min_context).await;
    reporter.clear();
    let mut info = result.map_err(|e| {
        tracing::debug!(error = %e, "Estimate failed");
        format!("{} ({})", e, short_error_message(&e))
    })?;

    if let Some(url) = &args.config_url {
        let model_config: ModelConfig =
            model_config::fetch_json_document(transport.as_ref(), url).await?;
        model_config::apply_model_config(&mut info, &model_config, finetune_context);
    }

    if let Some(url) = &args.model_index_url {
        let index: ModelIndex = model_config::fetch_json_document(transport.as_ref(), url).await?;
        model_config::apply_model_index(&mut info, &index);
    }

    print_model_info(&info, args.output)?;
    Ok(())
}

fn print_model_info(info: &ModelInfo, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Table => println!("{}", render(&model_info_rows(info), format)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(info)?),
    }
    Ok(())
}

/// Table rows for a model estimate. Zero-valued architecture fields are omitted.
pub(crate) fn model_info_rows(info: &ModelInfo) -> Vec<FieldRow> {
    let mut rows = Vec::new();

    if let Some(architecture) = &info.architecture {
        rows.push(FieldRow::new("Architecture", architecture));
    }
    if let Some(model_type) = &info.model_type {
        rows.push(FieldRow::new("Model type", model_type));
    }
    if let Some(class_name) = &info.class_name {
        rows.push(FieldRow::new("Pipeline class", class_name));
    }

    if info.has_parameters() {
        rows.push(FieldRow::new("Parameters", info.total_params));
        rows.push(FieldRow::new("Parameters (B)", info.params_billions));
        rows.push(FieldRow::new("Tensor type", &info.tensor_type));
        rows.push(FieldRow::new("Bytes per parameter", info.bytes_per_param));
    }

    rows.push(FieldRow::new("Weights (GiB)", info.model_weights_gb));
    rows.push(FieldRow::new("Inference GPU (GiB)", info.mini_gpu_memory_gb));
    if info.mini_gpu_finetune_gb > 0.0 {
        rows.push(FieldRow::new("LoRA fine-tune GPU (GiB)", info.mini_gpu_finetune_gb));
    }
    rows.push(FieldRow::new("Context size", info.context_size));
    rows.push(FieldRow::new("Batch size", info.batch_size));

    if info.hidden_size > 0 {
        rows.push(FieldRow::new("Hidden size", info.hidden_size));
        rows.push(FieldRow::new("Layers", info.num_hidden_layers));
        rows.push(FieldRow::new("Attention heads", info.num_attention_heads));
    }

    rows
}
