use modelsize::memory::{
    FinetuneInputs, GIB, activation_memory_gb, extra_overhead, kv_cache_size_gb,
    lora_finetune_memory_gb, round2,
};
use modelsize::model_config::{DEFAULT_FINETUNE_BATCH_SIZE, DEFAULT_LORA_RANK};

use crate::commands::{FieldRow, OutputFormat, render};
use crate::config::Config;

/// Inputs for the memory command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct MemoryArgs {
    /// Model weight size in GiB
    #[arg(short = 'w', long, default_value_t = 0.0)]
    pub weights_gb: f64,

    /// Parameter count in billions
    #[arg(short = 'p', long, default_value_t = 0.0)]
    pub params_billions: f64,

    /// Hidden size
    #[arg(short = 'H', long)]
    pub hidden: u64,

    /// Number of hidden layers
    #[arg(short = 'l', long)]
    pub layers: u64,

    /// Number of attention heads
    #[arg(short = 'a', long)]
    pub heads: u64,

    /// Bytes per parameter
    #[arg(short = 'b', long, default_value_t = 2)]
    pub bytes_per_param: u64,

    /// Inference context size (default from config or 4096)
    #[arg(short = 'x', long)]
    pub context: Option<u64>,

    /// Inference batch size
    #[arg(long, default_value_t = 1)]
    pub batch: u64,

    /// Fine-tune context size (default from config or 1024)
    #[arg(short = 'f', long)]
    pub finetune_context: Option<u64>,

    /// Fine-tune batch size
    #[arg(long, default_value_t = DEFAULT_FINETUNE_BATCH_SIZE)]
    pub finetune_batch: u64,

    /// LoRA rank
    #[arg(short = 'r', long, default_value_t = DEFAULT_LORA_RANK)]
    pub lora_rank: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Handle the memory command.
pub(crate) fn handle_memory(
    args: MemoryArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = memory_rows(&args, config);
    println!("{}", render(&rows, args.output)?);
    Ok(())
}

fn memory_rows(args: &MemoryArgs, config: &Config) -> Vec<FieldRow> {
    let context = args.context.unwrap_or(config.estimate.min_context);
    let finetune_context = args
        .finetune_context
        .unwrap_or(config.estimate.finetune_context);

    let kv_cache = kv_cache_size_gb(context, args.batch, args.hidden, args.layers, args.bytes_per_param);
    let activation = activation_memory_gb(
        args.batch,
        context,
        args.layers,
        args.hidden,
        args.heads,
        args.bytes_per_param,
    );
    let inference = round2(kv_cache + args.weights_gb + activation);
    let finetune = lora_finetune_memory_gb(&FinetuneInputs {
        model_weights_gb: args.weights_gb,
        total_params: args.params_billions * 1e9,
        batch_size: args.finetune_batch,
        context_size: finetune_context,
        hidden_size: args.hidden,
        num_layers: args.layers,
        num_heads: args.heads,
        bytes_per_param: args.bytes_per_param,
        lora_rank: args.lora_rank,
    });
    let weight_bytes = (args.weights_gb * GIB as f64) as u64;
    let overhead = extra_overhead(weight_bytes) / GIB as f64;

    vec![
        FieldRow::new("KV cache (GiB)", round2(kv_cache)),
        FieldRow::new("Activations (GiB)", round2(activation)),
        FieldRow::new("Inference GPU (GiB)", inference),
        FieldRow::new("LoRA fine-tune GPU (GiB)", finetune),
        FieldRow::new("Runtime overhead (GiB)", round2(overhead)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: MemoryArgs,
    }

    fn parse(args: &[&str]) -> MemoryArgs {
        TestCli::try_parse_from(std::iter::once("memory").chain(args.iter().copied()))
            .expect("arguments parse")
            .args
    }

    fn value<'a>(rows: &'a [FieldRow], field: &str) -> &'a str {
        rows.iter()
            .find(|r| r.field == field)
            .map(|r| r.value.as_str())
            .expect("row present")
    }

    #[test]
    fn seven_b_model() {
        let args = parse(&[
            "--weights-gb", "14", "--params-billions", "7.62", "--hidden", "3584", "--layers",
            "28", "--heads", "28", "--context", "5120", "--finetune-context", "512",
        ]);
        let rows = memory_rows(&args, &Config::default());

        assert_eq!(value(&rows, "KV cache (GiB)"), "1");
        assert_eq!(value(&rows, "Activations (GiB)"), "8");
        assert_eq!(value(&rows, "Inference GPU (GiB)"), "23");
        assert_eq!(value(&rows, "LoRA fine-tune GPU (GiB)"), "18.86");
        assert_eq!(value(&rows, "Runtime overhead (GiB)"), "0.7");
    }

    #[test]
    fn architecture_flags_are_required() {
        assert!(TestCli::try_parse_from(["memory", "--weights-gb", "14"]).is_err());
    }
}
