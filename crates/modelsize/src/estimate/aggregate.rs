use super::options::GpuMemoryMode;
use crate::memory::{GIB, round2};
use crate::model_info::ModelInfo;
use crate::safetensors::{SafetensorsHeader, TensorError};

/// Per-shard counts reported in progress events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ShardStats {
    pub tensors: usize,
    pub skipped: usize,
    pub params: u64,
}

/// Running totals across every shard of a call.
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    total_params: u64,
    weight_bytes: u64,
    // Never accumulated; feeds `GpuMemoryMode::Legacy`.
    tracked_gpu_bytes: u64,
    dtypes: Vec<String>,
    bytes_per_param: u64,
}

impl Accumulator {
    /// Account every tensor of one shard header.
    ///
    /// Malformed entries are skipped and logged; they never fail the call.
    pub(crate) fn add_header(&mut self, url: &str, header: &SafetensorsHeader) -> ShardStats {
        let mut stats = ShardStats::default();

        for entry in header.tensors() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    skip(url, &e);
                    stats.skipped += 1;
                    continue;
                }
            };

            // The label is recorded even when the shape turns out malformed.
            if let Some(dtype) = entry.dtype() {
                self.record_dtype(dtype);
            }

            match entry.summarize() {
                Ok(summary) => {
                    let params = summary.params();
                    self.total_params = self.total_params.saturating_add(params);
                    self.weight_bytes = self.weight_bytes.saturating_add(summary.size_bytes);
                    self.bytes_per_param = crate::dtype::bytes_per_param(&summary.dtype);
                    stats.tensors += 1;
                    stats.params = stats.params.saturating_add(params);
                }
                Err(e) => {
                    tracing::debug!(url, tensor = entry.name(), error = %e, "Skipping tensor");
                    stats.skipped += 1;
                }
            }
        }

        stats
    }

    fn record_dtype(&mut self, dtype: &str) {
        if !self.dtypes.iter().any(|seen| seen == dtype) {
            self.dtypes.push(dtype.to_string());
        }
    }

    /// Build the result of the header-accounting path.
    pub(crate) fn finish(self, min_context: u64, gpu_memory: GpuMemoryMode) -> ModelInfo {
        let gpu_bytes = match gpu_memory {
            GpuMemoryMode::Legacy => self.tracked_gpu_bytes,
            GpuMemoryMode::FromWeights => self.weight_bytes,
        };

        ModelInfo {
            total_params: self.total_params,
            params_billions: round2(self.total_params as f64 / 1e9),
            tensor_type: self.dtypes.join(" "),
            model_weights_gb: (self.weight_bytes / GIB) as f64,
            mini_gpu_memory_gb: ((gpu_bytes / GIB) as f64).max(1.0),
            context_size: min_context,
            batch_size: 1,
            bytes_per_param: self.bytes_per_param,
            ..ModelInfo::default()
        }
    }
}

fn skip(url: &str, error: &TensorError) {
    tracing::debug!(url, error = %error, "Skipping header entry");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(json: &str) -> SafetensorsHeader {
        SafetensorsHeader::from_slice(json.as_bytes()).expect("valid header")
    }

    fn ten_large_tensors() -> SafetensorsHeader {
        let mut entries = vec![r#""weight1": {"dtype": "F32", "shape": [7168, 16384]}"#.to_string()];
        for i in 2..=10 {
            entries.push(format!(
                r#""weight{i}": {{"dtype": "I64", "shape": [7168, 16384]}}"#
            ));
        }
        entries.push(r#""__metadata__": {}"#.to_string());
        header(&format!("{{{}}}", entries.join(",")))
    }

    #[test]
    fn single_shard_totals() {
        let mut acc = Accumulator::default();
        let stats = acc.add_header("file1", &ten_large_tensors());
        assert_eq!(stats.tensors, 10);
        assert_eq!(stats.params, 1_174_405_120);

        let info = acc.finish(512, GpuMemoryMode::Legacy);
        assert_eq!(info.total_params, 1_174_405_120);
        assert_eq!(info.params_billions, 1.17);
        assert_eq!(info.tensor_type, "F32 I64");
        assert_eq!(info.bytes_per_param, 8);
        assert_eq!(info.context_size, 512);
        assert_eq!(info.batch_size, 1);
    }

    #[test]
    fn two_shards_double_params_and_truncate_weights() {
        let mut acc = Accumulator::default();
        acc.add_header("file1", &ten_large_tensors());
        acc.add_header("file2", &ten_large_tensors());

        let info = acc.finish(128, GpuMemoryMode::Legacy);
        assert_eq!(info.total_params, 2_348_810_240);
        assert_eq!(info.params_billions, 2.35);
        // (1 * 4 + 9 * 8) bytes * 117_440_512 params * 2 shards = 16.6 GiB
        assert_eq!(info.model_weights_gb, 16.0);
        assert_eq!(info.mini_gpu_memory_gb, 1.0);
    }

    #[test]
    fn gpu_memory_from_weights() {
        let mut acc = Accumulator::default();
        acc.add_header("file1", &ten_large_tensors());
        acc.add_header("file2", &ten_large_tensors());

        let info = acc.finish(128, GpuMemoryMode::FromWeights);
        assert_eq!(info.mini_gpu_memory_gb, 16.0);
    }

    #[test]
    fn dtype_label_keeps_first_seen_order_without_duplicates() {
        let mut acc = Accumulator::default();
        acc.add_header(
            "file1",
            &header(
                r#"{
                "weight1": {"dtype": "F32", "shape": [10, 20]},
                "weight2": {"dtype": "F16", "shape": [5, 8]},
                "weight3": {"dtype": "BF16", "shape": [3, 4]},
                "__metadata__": {}
            }"#,
            ),
        );
        acc.add_header(
            "file2",
            &header(r#"{"weight4": {"dtype": "F16", "shape": [1]}, "weight5": {"dtype": "I8", "shape": [1]}}"#),
        );

        let info = acc.finish(256, GpuMemoryMode::Legacy);
        assert_eq!(info.total_params, 200 + 40 + 12 + 1 + 1);
        assert_eq!(info.tensor_type, "F32 F16 BF16 I8");
        assert_eq!(info.bytes_per_param, 1);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut acc = Accumulator::default();
        let stats = acc.add_header(
            "file1",
            &header(
                r#"{
                "weight1": {"dtype": "F32", "shape": "invalid_shape"},
                "weight2": "invalid_tensor_data",
                "weight3": {"dtype": "F16"},
                "__metadata__": {}
            }"#,
            ),
        );
        assert_eq!(stats.tensors, 0);
        assert_eq!(stats.skipped, 3);

        let info = acc.finish(64, GpuMemoryMode::Legacy);
        assert_eq!(info.total_params, 0);
        assert_eq!(info.tensor_type, "F32 F16");
        assert_eq!(info.bytes_per_param, 0);
    }

    #[test]
    fn metadata_only_header_yields_empty_label() {
        let mut acc = Accumulator::default();
        acc.add_header("file1", &header(r#"{"__metadata__": {}}"#));

        let info = acc.finish(64, GpuMemoryMode::Legacy);
        assert_eq!(info.total_params, 0);
        assert_eq!(info.tensor_type, "");
        assert_eq!(info.mini_gpu_memory_gb, 1.0);
    }
}
