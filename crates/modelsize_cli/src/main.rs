//! Modelsize CLI - estimate model size and GPU memory from safetensors shards.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;
use crate::commands::estimate::EstimateArgs;
use crate::commands::memory::MemoryArgs;
use crate::commands::size::SizeArgs;

#[derive(Parser)]
#[command(name = "modelsize")]
#[command(version)]
#[command(about = "Estimate model size and GPU memory from safetensors headers")]
#[command(
    long_about = "Modelsize reads the headers of remote safetensors shards with HTTP range \
requests and reports parameter counts, tensor dtypes, weight size, and GPU memory \
estimates for inference and LoRA fine-tuning. No tensor data is downloaded."
)]
#[command(after_long_help = r#"EXAMPLES
    Estimate a sharded model:
        $ modelsize estimate \
            https://huggingface.co/Qwen/Qwen2-7B/resolve/main/model-00001-of-00004.safetensors \
            https://huggingface.co/Qwen/Qwen2-7B/resolve/main/model-00002-of-00004.safetensors

    Refine GPU memory with the model config:
        $ modelsize estimate <URL>... --config-url https://huggingface.co/Qwen/Qwen2-7B/resolve/main/config.json

    Fetch four shards at once and print JSON:
        $ modelsize estimate <URL>... --concurrency 4 --output json

    Memory for a known architecture:
        $ modelsize memory --weights-gb 14 --params-billions 7.6 --hidden 3584 --layers 28 --heads 28

    Generate shell completions:
        $ modelsize completions bash > ~/.local/share/bash-completion/completions/modelsize

CONFIGURATION
    Modelsize reads configuration from:
      1. ~/.config/modelsize/config.toml (or $XDG_CONFIG_HOME/modelsize/config.toml)
      2. ./modelsize.toml
      3. Environment variables (MODELSIZE_* prefix, e.g., MODELSIZE_ESTIMATE__CONCURRENCY)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    MODELSIZE_ESTIMATE__MIN_CONTEXT       Inference context size (default: 4096)
    MODELSIZE_ESTIMATE__FINETUNE_CONTEXT  Fine-tune context size (default: 1024)
    MODELSIZE_ESTIMATE__CONCURRENCY       Shards fetched at once (default: 1)
    MODELSIZE_ESTIMATE__TIMEOUT_SECS      Per-request timeout (default: 30)
    MODELSIZE_ESTIMATE__GPU_MEMORY        legacy or from-weights (default: legacy)
    MODELSIZE_HTTP__INSECURE              Accept invalid TLS certificates (default: false)
    RUST_LOG                              Log filter when output is not a terminal
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate parameters and memory from safetensors shard headers
    Estimate(EstimateArgs),
    /// Report the size of remote files from a one-byte range request
    Size(SizeArgs),
    /// Compute GPU memory estimates for a given architecture
    Memory(MemoryArgs),
    /// Map dtype names to safetensors labels and bytes per parameter
    Dtype {
        /// PyTorch or safetensors dtype name(s), e.g. bfloat16 or F16
        #[arg(required = true)]
        names: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not connected to a TTY; progress bars otherwise
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("modelsize=info,modelsize_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    // Commands that need neither configuration nor network
    match &cli.command {
        Commands::Dtype { names, output } => {
            commands::dtype::handle_dtype(names, *output)?;
            return Ok(());
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    match cli.command {
        Commands::Estimate(args) => {
            let shutdown_flag = shutdown::setup_shutdown_handler();
            commands::estimate::handle_estimate(args, &config, shutdown_flag).await?;
        }
        Commands::Size(args) => {
            let shutdown_flag = shutdown::setup_shutdown_handler();
            commands::size::handle_size(args, &config, shutdown_flag).await?;
        }
        Commands::Memory(args) => {
            commands::memory::handle_memory(args, &config)?;
        }
        Commands::Dtype { .. } | Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn estimate_accepts_multiple_urls() {
        let cli = Cli::try_parse_from([
            "modelsize",
            "estimate",
            "https://hub.example.com/a.safetensors",
            "https://hub.example.com/b.safetensors",
            "--output",
            "json",
        ])
        .expect("arguments parse");

        match cli.command {
            Commands::Estimate(args) => {
                assert_eq!(args.urls.len(), 2);
                assert!(matches!(args.output, OutputFormat::Json));
            }
            _ => panic!("expected estimate"),
        }
    }

    #[test]
    fn unknown_gpu_memory_mode_is_rejected() {
        let result = Cli::try_parse_from([
            "modelsize",
            "estimate",
            "https://hub.example.com/a.safetensors",
            "--gpu-memory",
            "everything",
        ]);
        assert!(result.is_err());
    }
}
