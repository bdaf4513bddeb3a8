use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use modelsize::EstimateProgress;

use super::shard_name;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Number of shards in the call.
    shards: usize,
    /// Bar for header fetches.
    header_bar: Option<ProgressBar>,
    /// Bar for size probes, created on fallback.
    size_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn add_bar(&self, prefix: &str, len: usize) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len as u64));
        pb.set_style(Self::bar_style());
        pb.set_prefix(format!("{:8}", prefix));
        pb
    }

    pub fn handle(&self, event: EstimateProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            EstimateProgress::Started {
                shards,
                concurrency,
            } => {
                state.shards = shards;
                let pb = self.add_bar("Headers", shards);
                if concurrency > 1 {
                    pb.set_message(format!("Fetching {} shards ({} at once)...", shards, concurrency));
                } else {
                    pb.set_message(format!("Fetching {} shards...", shards));
                }
                state.header_bar = Some(pb);
            }

            EstimateProgress::FetchingHeader { url, .. } => {
                if let Some(ref pb) = state.header_bar {
                    pb.set_message(shard_name(&url).to_string());
                }
            }

            EstimateProgress::HeaderParsed {
                url,
                tensors,
                skipped,
                ..
            } => {
                if let Some(ref pb) = state.header_bar {
                    pb.inc(1);
                    let msg = if skipped > 0 {
                        format!("{}: {} tensors, {} skipped", shard_name(&url), tensors, skipped)
                    } else {
                        format!("{}: {} tensors", shard_name(&url), tensors)
                    };
                    pb.set_message(msg);
                }
            }

            EstimateProgress::HeaderTooLarge { url, length, .. } => {
                if let Some(ref pb) = state.header_bar {
                    pb.abandon_with_message(format!(
                        "{}: header of {} bytes is too large, using file sizes",
                        shard_name(&url),
                        length
                    ));
                }
            }

            EstimateProgress::ProbingSize { url, .. } => {
                if state.size_bar.is_none() {
                    let pb = self.add_bar("Sizes", state.shards);
                    state.size_bar = Some(pb);
                }
                if let Some(ref pb) = state.size_bar {
                    pb.set_message(shard_name(&url).to_string());
                }
            }

            EstimateProgress::SizeProbed { url, size_gb, .. } => {
                if let Some(ref pb) = state.size_bar {
                    pb.inc(1);
                    pb.set_message(format!("{}: {:.2} GiB", shard_name(&url), size_gb));
                }
            }

            EstimateProgress::ShardFailed { url, error, .. } => {
                self.multi
                    .println(format!("  ✗ {}: {}", shard_name(&url), error))
                    .ok();
            }

            EstimateProgress::Complete {
                total_params,
                model_weights_gb,
                size_only,
            } => {
                if let Some(ref pb) = state.size_bar
                    && !pb.is_finished()
                {
                    pb.finish_with_message(format!("{} GiB", model_weights_gb));
                }
                if !size_only
                    && let Some(ref pb) = state.header_bar
                    && !pb.is_finished()
                {
                    pb.finish_with_message(format!("{} parameters", total_params));
                }
            }

            _ => {}
        }
    }

    pub fn clear(&self) {
        self.multi.clear().ok();
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
