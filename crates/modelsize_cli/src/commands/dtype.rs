use modelsize::dtype::{bytes_per_param, torch_dtype_to_safetensors};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::{OutputFormat, render};

/// Safetensors label and width for one dtype name.
#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct DtypeRow {
    #[tabled(rename = "Input")]
    pub input: String,
    #[tabled(rename = "Safetensors")]
    pub safetensors: String,
    #[tabled(rename = "Bytes/param")]
    pub bytes_per_param: u64,
}

impl DtypeRow {
    fn from_name(name: &str) -> Self {
        let safetensors = torch_dtype_to_safetensors(name);
        let bytes_per_param = bytes_per_param(&safetensors);
        Self {
            input: name.to_string(),
            safetensors,
            bytes_per_param,
        }
    }
}

/// Handle the dtype command.
pub(crate) fn handle_dtype(
    names: &[String],
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows: Vec<_> = names.iter().map(|n| DtypeRow::from_name(n)).collect();
    println!("{}", render(&rows, output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torch_names_map_to_labels_and_widths() {
        let row = DtypeRow::from_name("bfloat16");
        assert_eq!(row.safetensors, "BF16");
        assert_eq!(row.bytes_per_param, 2);

        let row = DtypeRow::from_name("int64");
        assert_eq!(row.safetensors, "I64");
        assert_eq!(row.bytes_per_param, 8);
    }

    #[test]
    fn safetensors_labels_pass_through() {
        let row = DtypeRow::from_name("F8_E4M3");
        assert_eq!(row.safetensors, "F8_E4M3");
        assert_eq!(row.bytes_per_param, 1);
    }
}
