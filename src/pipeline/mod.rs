//! Processing pipeline components.

mod coordinator;
mod processor;
mod report;
mod runner;
mod status;

pub use coordinator::{
    BatchSummary, ProcessCheck, ProcessOptions, RecordingOutcome, collect_recordings,
    detections_path_for, metadata_path_for_report, output_dir_for, output_path_for,
    process_batch, should_process,
};
pub use processor::{ProcessResult, process_recording, recluster_report, write_report};
pub use report::{RecordingReport, RecordingSummary, load_report};
pub use runner::{AlignmentPipeline, CancelFlag, PipelineSettings};
pub use status::ProcessingStatus;
