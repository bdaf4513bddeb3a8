pub(crate) mod dtype;
pub(crate) mod estimate;
pub(crate) mod memory;
pub(crate) mod meta;
pub(crate) mod size;

use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Render rows as a rounded table or pretty JSON.
pub(crate) fn render<T: Serialize + Tabled>(
    items: &[T],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(items);
            table.with(tabled::settings::Style::rounded());
            Ok(table.to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(items),
    }
}

/// A name/value row for single-record output.
#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub(crate) fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
