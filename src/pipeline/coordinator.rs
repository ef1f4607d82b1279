//! Pipeline coordination for recording processing.

use super::{CancelFlag, PipelineSettings, ProcessResult, process_recording};
use crate::align::AlignmentPolicy;
use crate::cluster::ClusterSettings;
use crate::config::{Config, OutputFormat};
use crate::constants::{DEFAULT_JOBS, inputs, output_extensions};
use crate::error::{Error, Result};
use crate::location::RecordingMetadata;
use crate::output::progress;
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Options for processing recordings.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProcessOptions {
    /// Output directory (None = same as input).
    pub output_dir: Option<PathBuf>,
    /// Output formats to generate.
    pub formats: Vec<OutputFormat>,
    /// Force reprocessing even if output exists.
    pub force: bool,
    /// Stop scheduling new recordings after the first failure.
    pub fail_fast: bool,
    /// Show progress bars.
    pub progress: bool,
    /// Recordings processed at the same time.
    pub jobs: usize,
    /// Frame rate forced for every recording.
    pub fps: Option<f64>,
    /// GPS interval forced for every recording.
    pub location_interval_ms: Option<u64>,
    /// Frame rate when neither the caller nor the recording has one.
    pub default_fps: f64,
    /// GPS interval when neither the caller nor the recording has one.
    pub default_location_interval_ms: u64,
    /// Multiplier on the GPS interval for the match window.
    pub acceptance_multiplier: f64,
    /// Clustering thresholds.
    pub clustering: ClusterSettings,
    /// Minimum confidence threshold.
    pub min_confidence: f32,
    /// Minimum frames between kept detecting frames.
    pub min_frame_gap: u64,
}

impl ProcessOptions {
    /// Options taken from configuration alone.
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: None,
            formats: config.output.formats.clone(),
            force: false,
            fail_fast: false,
            progress: true,
            jobs: DEFAULT_JOBS,
            fps: None,
            location_interval_ms: None,
            default_fps: config.alignment.default_fps,
            default_location_interval_ms: config.alignment.location_update_interval_ms,
            acceptance_multiplier: config.alignment.acceptance_multiplier,
            clustering: config.clustering,
            min_confidence: config.detection.min_confidence,
            min_frame_gap: config.detection.min_frame_gap,
        }
    }

    /// Alignment policy for one recording.
    ///
    /// Forced values win, then the recording's own metadata, then defaults.
    pub fn policy_for(&self, metadata: &RecordingMetadata) -> Result<AlignmentPolicy> {
        let fps = self
            .fps
            .or_else(|| metadata.fps())
            .unwrap_or(self.default_fps);
        let interval = self
            .location_interval_ms
            .or_else(|| metadata.location_interval_ms())
            .unwrap_or(self.default_location_interval_ms);

        AlignmentPolicy::new(fps, interval, self.acceptance_multiplier)
    }

    /// Full pipeline settings for one recording.
    pub fn settings_for(&self, metadata: &RecordingMetadata) -> Result<PipelineSettings> {
        Ok(PipelineSettings {
            alignment: self.policy_for(metadata)?,
            clustering: self.clustering,
            min_confidence: self.min_confidence,
            min_frame_gap: self.min_frame_gap,
        })
    }
}

/// Result of checking whether a recording should be processed.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessCheck {
    /// Recording should be processed.
    Process,
    /// Skip - output already exists.
    SkipExists,
}

/// What happened to one recording in a batch.
#[derive(Debug)]
pub enum RecordingOutcome {
    /// Processed and written.
    Processed(ProcessResult),
    /// Outputs already present.
    Skipped,
    /// Never started because the batch was cancelled.
    Cancelled,
    /// Failed.
    Failed(Error),
}

/// Totals over a batch of recordings.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Recordings processed.
    pub processed: usize,
    /// Recordings skipped because their outputs exist.
    pub skipped: usize,
    /// Recordings cancelled before they finished.
    pub cancelled: usize,
    /// Failed recordings with their errors, in completion order.
    pub failures: Vec<(PathBuf, Error)>,
    /// Resolved detections over all processed recordings.
    pub detections_created: usize,
    /// Unresolved detections over all processed recordings.
    pub detections_unresolved: usize,
    /// Clusters over all processed recordings.
    pub clusters_created: usize,
}

impl BatchSummary {
    fn record(&mut self, path: PathBuf, outcome: RecordingOutcome) {
        match outcome {
            RecordingOutcome::Processed(result) => {
                self.processed += 1;
                self.detections_created += result.summary.detections_created;
                self.detections_unresolved += result.summary.detections_unresolved;
                self.clusters_created += result.summary.clusters_created;
            }
            RecordingOutcome::Skipped => self.skipped += 1,
            RecordingOutcome::Cancelled => self.cancelled += 1,
            RecordingOutcome::Failed(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                self.failures.push((path, e));
            }
        }
    }
}

/// Determine the output directory for a recording.
pub fn output_dir_for(input: &Path, explicit_output_dir: Option<&Path>) -> PathBuf {
    explicit_output_dir.map_or_else(
        || {
            input
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        },
        Path::to_path_buf,
    )
}

/// Get output file path for a given format.
pub fn output_path_for(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    // Non-UTF-8 stems are kept lossily rather than rejected.
    let stem = input.file_stem().map_or_else(
        || std::borrow::Cow::Borrowed("output"),
        |s| s.to_string_lossy(),
    );

    let extension = match format {
        OutputFormat::Json => output_extensions::JSON,
        OutputFormat::Csv => output_extensions::CSV,
        OutputFormat::Geojson => output_extensions::GEOJSON,
    };

    output_dir.join(format!("{stem}{extension}"))
}

/// Detection file expected next to a metadata file: `<stem>.detections.csv`.
pub fn detections_path_for(metadata_path: &Path) -> PathBuf {
    let stem = metadata_path.file_stem().map_or_else(
        || std::borrow::Cow::Borrowed("recording"),
        |s| s.to_string_lossy(),
    );
    let dir = metadata_path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}{}", inputs::DETECTIONS_SUFFIX))
}

/// Metadata path a report was written for, so sibling outputs can be named.
///
/// `walk.geoalign.json` maps back to `walk.json`.
pub fn metadata_path_for_report(report_path: &Path) -> PathBuf {
    let name = report_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(output_extensions::JSON)
        .map_or_else(
            || {
                report_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            },
            str::to_string,
        );
    report_path.with_file_name(format!("{stem}.{}", inputs::METADATA_EXTENSION))
}

/// Check if a recording should be processed.
pub fn should_process(
    input: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
    force: bool,
) -> ProcessCheck {
    if !force {
        let all_exist = formats
            .iter()
            .all(|fmt| output_path_for(input, output_dir, *fmt).exists());
        if all_exist {
            return ProcessCheck::SkipExists;
        }
    }

    ProcessCheck::Process
}

/// Collect recording metadata files from paths (files and directories).
///
/// Explicit files are taken as given. Directories are searched recursively
/// for metadata that has a detection file next to it; our own reports are
/// never picked up.
pub fn collect_recordings(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_metadata_file(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping non-metadata file: {}", path.display());
            }
        } else if path.is_dir() {
            collect_recordings_recursive(path, &mut files)?;
        } else {
            warn!("Skipping non-existent path: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Recursively collect metadata files from a directory.
fn collect_recordings_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_recordings_recursive(&path, files)?;
        } else if is_metadata_file(&path) && detections_path_for(&path).is_file() {
            files.push(path);
        }
    }

    Ok(())
}

/// Check if a file looks like recording metadata.
fn is_metadata_file(path: &Path) -> bool {
    use std::ffi::OsStr;

    let is_report = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(output_extensions::JSON));

    !is_report
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(OsStr::new(inputs::METADATA_EXTENSION)))
}

/// Process recordings concurrently.
///
/// Each recording runs on the blocking pool; at most `options.jobs` run at
/// once. With `fail_fast`, the first failure cancels the rest.
pub async fn process_batch(
    recordings: Vec<PathBuf>,
    options: Arc<ProcessOptions>,
    cancel: CancelFlag,
) -> BatchSummary {
    let multi_progress = MultiProgress::new();
    let recording_progress = progress::create_recording_progress(recordings.len(), options.progress)
        .map(|pb| multi_progress.add(pb));

    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for path in recordings {
        let semaphore = Arc::clone(&semaphore);
        let options = Arc::clone(&options);
        let cancel = cancel.clone();
        let multi_progress = multi_progress.clone();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (path, RecordingOutcome::Cancelled);
            };
            if cancel.is_cancelled() {
                return (path, RecordingOutcome::Cancelled);
            }

            let job_path = path.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                run_job(&job_path, &options, &cancel, &multi_progress)
            })
            .await
            .unwrap_or_else(|e| {
                RecordingOutcome::Failed(Error::Internal {
                    message: format!("recording task failed: {e}"),
                })
            });

            (path, outcome)
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let (path, outcome) = match joined {
            Ok(done) => done,
            Err(e) => (
                PathBuf::new(),
                RecordingOutcome::Failed(Error::Internal {
                    message: format!("recording task failed: {e}"),
                }),
            ),
        };

        if matches!(outcome, RecordingOutcome::Failed(_)) && options.fail_fast {
            cancel.cancel();
        }
        summary.record(path, outcome);
        progress::inc_progress(recording_progress.as_ref());
    }

    progress::finish_progress(recording_progress, "Complete");
    summary
}

/// Check and process one recording.
fn run_job(
    path: &Path,
    options: &ProcessOptions,
    cancel: &CancelFlag,
    multi_progress: &MultiProgress,
) -> RecordingOutcome {
    let output_dir = output_dir_for(path, options.output_dir.as_deref());

    match should_process(path, &output_dir, &options.formats, options.force) {
        ProcessCheck::SkipExists => {
            info!("Skipping (output exists): {}", path.display());
            return RecordingOutcome::Skipped;
        }
        ProcessCheck::Process => {}
    }

    let outcome = outcome_of(process_recording(path, &output_dir, options, cancel, multi_progress));
    if matches!(outcome, RecordingOutcome::Cancelled) {
        info!("Cancelled: {}", path.display());
    }
    outcome
}

/// A recording stopped by cancellation is not an error.
fn outcome_of(result: Result<ProcessResult>) -> RecordingOutcome {
    match result {
        Ok(result) => RecordingOutcome::Processed(result),
        Err(e) if e.is_cancelled() => RecordingOutcome::Cancelled,
        Err(e) => RecordingOutcome::Failed(e),
    }
}
