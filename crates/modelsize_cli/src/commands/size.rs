use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use modelsize::memory::round2;
use modelsize::{EstimateOptions, Estimator, short_error_message};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::{OutputFormat, render};
use crate::config::Config;
use crate::progress::shard_name;

/// Options for the size command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SizeArgs {
    /// File URL(s) to probe
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Per-request timeout in seconds (default from config or 30)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Probed size of one file.
#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct SizeRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Size (GiB)")]
    pub size_gb: f64,
    #[tabled(skip)]
    pub url: String,
}

/// Handle the size command.
pub(crate) async fn handle_size(
    args: SizeArgs,
    config: &Config,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.estimate.timeout());
    let estimator = Estimator::with_reqwest(timeout, args.insecure || config.http.insecure)?
        .with_options(EstimateOptions::default().shutdown_flag(shutdown_flag));

    let mut rows = Vec::with_capacity(args.urls.len());
    for url in &args.urls {
        let size_gb = estimator
            .file_size_gb(url)
            .await
            .map_err(|e| format!("{} ({})", e, short_error_message(&e)))?;
        tracing::debug!(url = %url, size_gb, "Probed file size");
        rows.push(size_row(url, size_gb));
    }

    if rows.len() > 1 && matches!(args.output, OutputFormat::Table) {
        let total = rows.iter().map(|r| r.size_gb).sum();
        rows.push(SizeRow {
            file: "Total".to_string(),
            size_gb: round2(total),
            url: String::new(),
        });
    }

    println!("{}", render(&rows, args.output)?);
    Ok(())
}

fn size_row(url: &str, size_gb: f64) -> SizeRow {
    SizeRow {
        file: shard_name(url).to_string(),
        size_gb: round2(size_gb),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_uses_file_name_and_rounds() {
        let row = size_row("https://hub.example.com/model-00001-of-00002.safetensors", 4.666_66);
        assert_eq!(row.file, "model-00001-of-00002.safetensors");
        assert_eq!(row.size_gb, 4.67);
    }

    #[test]
    fn json_keeps_the_full_url() {
        let rows = vec![size_row("https://hub.example.com/model.safetensors", 5.0)];
        let out = render(&rows, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["url"], "https://hub.example.com/model.safetensors");
        assert_eq!(value[0]["size_gb"], 5.0);
    }
}
