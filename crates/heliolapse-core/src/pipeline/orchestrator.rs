use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use tracing::{info, warn};

use crate::error::{HelioError, Result};
use crate::filters::normalize::normalize;
use crate::io::listing::list_frames;
use crate::io::{FileCodec, FrameCodec, FrameFormat};
use crate::video::{Captioner, FrameManifest};

use super::config::AlignConfig;
use super::job::{align_frame, AlignmentResult, FailedFrame, FrameJob, ReferenceFrame};
use super::types::{CancelFlag, JobState, NoOpReporter, PipelineStage, ProgressReporter};

/// File name of the manifest written next to the aligned frames.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// How a finished run went, as seen by the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every frame aligned.
    Complete,
    /// Some frames aligned, some failed.
    Partial,
    /// No frame aligned.
    Failed,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Partial => 2,
            Self::Failed => 1,
        }
    }
}

/// Process exit status for an interrupted run.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct AlignmentReport {
    /// One result per input frame, sorted by job index.
    pub results: Vec<AlignmentResult>,
    /// Successful outputs in job order, ready for video assembly.
    pub manifest: FrameManifest,
}

impl AlignmentReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailedFrame> {
        self.results.iter().filter_map(|r| match r {
            AlignmentResult::Failed(f) => Some(f),
            AlignmentResult::Succeeded(_) => None,
        })
    }

    pub fn outcome(&self) -> RunOutcome {
        let ok = self.succeeded();
        if ok == self.total() {
            RunOutcome::Complete
        } else if ok == 0 {
            RunOutcome::Failed
        } else {
            RunOutcome::Partial
        }
    }
}

/// Load and normalize the reference frame.
///
/// Any failure is wrapped in `HelioError::Reference`.
pub fn load_reference(path: &Path, codec: &dyn FrameCodec) -> Result<ReferenceFrame> {
    let wrap = |source: HelioError| HelioError::Reference {
        path: path.to_path_buf(),
        source: Box::new(source),
    };

    let format = FrameFormat::from_path(path).ok_or_else(|| {
        wrap(HelioError::UnsupportedFormat(path.display().to_string()))
    })?;
    let raw = codec.decode(path, format).map_err(wrap)?;
    let frame = normalize(&raw).map_err(wrap)?;
    ReferenceFrame::new(path.to_path_buf(), format, frame).map_err(wrap)
}

/// Jobs for `paths`, indexed in the given order.
pub fn build_jobs(paths: Vec<PathBuf>) -> Vec<FrameJob> {
    paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| FrameJob::new(index, path))
        .collect()
}

/// Align every frame of the configured input directory with the file codec.
pub fn run_alignment(config: &AlignConfig) -> Result<AlignmentReport> {
    run_alignment_reported(
        config,
        Arc::new(FileCodec),
        Arc::new(NoOpReporter),
        &CancelFlag::new(),
    )
}

/// Align every frame of the configured input directory.
///
/// Frames with the reference's container are listed in file-name order and
/// dispatched in that order to a pool of `config.worker_count()` threads. A frame that fails
/// is logged and reported; it never stops its siblings. A cancelled run
/// returns `HelioError::Cancelled` and writes no manifest.
pub fn run_alignment_reported(
    config: &AlignConfig,
    codec: Arc<dyn FrameCodec>,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelFlag,
) -> Result<AlignmentReport> {
    config.validate()?;

    reporter.begin_stage(PipelineStage::LoadingReference, None);
    let reference = Arc::new(load_reference(&config.reference, codec.as_ref())?);
    let (height, width) = reference.shape();
    info!(
        reference = %config.reference.display(),
        width,
        height,
        format = %reference.format,
        "Reference loaded"
    );
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Listing, None);
    let jobs = build_jobs(list_frames(&config.input_dir, reference.format)?);
    reporter.finish_stage();
    if jobs.is_empty() {
        return Err(HelioError::EmptySequence(config.input_dir.clone()));
    }

    std::fs::create_dir_all(&config.aligned_dir)?;
    let captioner = Captioner::from_config(&config.video)?;

    let workers = config.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    info!(
        frames = jobs.len(),
        workers,
        mode = %config.registration.mode,
        force = %config.registration.force,
        iterations = config.registration.iterations,
        std_dev = config.registration.std_dev,
        "Aligning frames"
    );

    let total = jobs.len();
    reporter.begin_stage(PipelineStage::Aligning, Some(total));
    for job in &jobs {
        reporter.job_state(job.index, &job.path, JobState::Pending, None);
    }
    let done = AtomicUsize::new(0);

    // Jobs are queued in file-name order; each result lands in its index slot.
    let (tx, rx) = mpsc::channel();
    pool.scope_fifo(|s| {
        for job in &jobs {
            let tx = tx.clone();
            let (reference, codec, reporter, done) = (&reference, &codec, &reporter, &done);
            s.spawn_fifo(move |_| {
                if cancel.is_cancelled() {
                    return;
                }
                let Some(result) =
                    run_job(job, reference, config, codec.as_ref(), reporter.as_ref(), cancel)
                else {
                    return;
                };
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.advance(n);
                let _ = tx.send(result);
            });
        }
    });
    drop(tx);
    reporter.finish_stage();

    let mut slots: Vec<Option<AlignmentResult>> = (0..total).map(|_| None).collect();
    for result in rx {
        let index = result.index();
        slots[index] = Some(result);
    }
    let results: Vec<AlignmentResult> = slots.into_iter().flatten().collect();

    if cancel.is_cancelled() {
        warn!(completed = results.len(), total, "Run cancelled");
        return Err(HelioError::Cancelled);
    }

    let manifest = FrameManifest::from_results(&results, &captioner);

    reporter.begin_stage(PipelineStage::WritingManifest, None);
    manifest.write_json(&config.aligned_dir.join(MANIFEST_FILE_NAME))?;
    reporter.finish_stage();

    let report = AlignmentReport { results, manifest };
    info!(
        aligned = report.succeeded(),
        total = report.total(),
        "Alignment finished"
    );
    Ok(report)
}

/// Align one job and report its transitions. `None` when cancelled mid-job.
fn run_job(
    job: &FrameJob,
    reference: &ReferenceFrame,
    config: &AlignConfig,
    codec: &dyn FrameCodec,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Option<AlignmentResult> {
    reporter.job_state(job.index, &job.path, JobState::Running, None);

    match align_frame(job, reference, config, codec, cancel) {
        Ok(aligned) => {
            info!(
                file = %job.path.display(),
                output = %aligned.output.display(),
                field = %aligned.stats,
                "Frame aligned"
            );
            reporter.job_state(job.index, &job.path, JobState::Succeeded, None);
            Some(AlignmentResult::Succeeded(aligned))
        }
        Err(HelioError::Cancelled) => None,
        Err(e) => {
            let reason = e.to_string();
            warn!(file = %job.path.display(), reason = %reason, "Frame failed");
            reporter.job_state(job.index, &job.path, JobState::Failed, Some(&reason));
            Some(AlignmentResult::Failed(FailedFrame {
                index: job.index,
                input: job.path.clone(),
                reason,
            }))
        }
    }
}
