use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use heliolapse_core::pipeline::{JobState, PipelineStage, ProgressReporter};

/// Progress bar driven by the pipeline's reporter callbacks.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:18} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        if let Some(total) = total_items {
            self.bar.set_length(total as u64);
            self.bar.set_position(0);
        }
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn job_state(&self, _index: usize, path: &Path, state: JobState, reason: Option<&str>) {
        if state == JobState::Failed {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            self.bar
                .println(format!("  failed: {name}: {}", reason.unwrap_or("unknown error")));
        }
    }
}
