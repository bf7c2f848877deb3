pub mod batch;
pub mod config;
mod job;
mod orchestrator;
mod types;

pub use batch::{match_sequence, MatchedFrame};
pub use job::{
    align_frame, AlignedFrame, AlignmentResult, FailedFrame, FrameJob, ReferenceFrame,
};
pub use orchestrator::{
    build_jobs, load_reference, run_alignment, run_alignment_reported, AlignmentReport,
    RunOutcome, EXIT_INTERRUPTED, MANIFEST_FILE_NAME,
};
pub use types::{CancelFlag, JobState, NoOpReporter, PipelineStage, ProgressReporter};
