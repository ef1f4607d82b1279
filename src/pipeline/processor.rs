//! Single recording processing.

use super::{
    AlignmentPipeline, CancelFlag, PipelineSettings, RecordingReport, RecordingSummary, detections_path_for,
    load_report, metadata_path_for_report, output_path_for,
};
use crate::cluster::SpatialClusterer;
use crate::config::OutputFormat;
use crate::detection::{
    DetectionEvent, DetectionId, DetectionSource, DetectionStatus, MemorySource,
    parse_detection_file,
};
use crate::error::{Error, Result};
use crate::location::{LocationSample, RecordingMetadata, load_metadata};
use crate::output::{CsvWriter, GeoJsonWriter, JsonReportWriter, OutputWriter, progress};
use crate::pipeline::ProcessOptions;
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Result of processing a single recording.
#[derive(Debug)]
pub struct ProcessResult {
    /// Recording identifier.
    pub recording: String,
    /// Counts from the run.
    pub summary: RecordingSummary,
    /// Files written.
    pub outputs: Vec<PathBuf>,
    /// Processing duration in seconds.
    pub duration_secs: f64,
}

/// Align and cluster one recording and write its outputs.
///
/// `metadata_path` is the recording's metadata JSON; its detections are
/// read from the sibling `<stem>.detections.csv`.
pub fn process_recording(
    metadata_path: &Path,
    output_dir: &Path,
    options: &ProcessOptions,
    cancel: &CancelFlag,
    multi_progress: &MultiProgress,
) -> Result<ProcessResult> {
    let start_time = Instant::now();

    info!("Processing: {}", metadata_path.display());

    let metadata = load_metadata(metadata_path)?;
    let recording = recording_id(metadata_path, &metadata);

    let prepared = prepare_inputs(metadata_path, &metadata, &recording, options);
    let (settings, events, samples) = match prepared {
        Ok(inputs) => inputs,
        Err(e) => {
            let mut pipeline = AlignmentPipeline::new(recording, PipelineSettings::default());
            return Err(pipeline.abort(e));
        }
    };

    let mut source = MemorySource::new(events);
    let frame_progress =
        progress::create_frame_progress(source.remaining_hint(), &recording, options.progress)
            .map(|pb| multi_progress.add(pb));
    let mut pipeline =
        AlignmentPipeline::new(recording.clone(), settings).with_progress(frame_progress.clone());

    let result = pipeline.run(samples, &mut source, cancel);
    progress::clear_progress(frame_progress.as_ref());
    let report = result?;

    let outputs = write_outputs(&report, metadata_path, output_dir, &options.formats)?;

    let duration_secs = start_time.elapsed().as_secs_f64();
    info!(
        "[{}] Wrote {} output file(s) in {:.2}s",
        recording,
        outputs.len(),
        duration_secs
    );

    Ok(ProcessResult {
        recording,
        summary: report.summary,
        outputs,
        duration_secs,
    })
}

/// Read the detections, resolve the settings and extract the location
/// samples for one recording.
fn prepare_inputs(
    metadata_path: &Path,
    metadata: &RecordingMetadata,
    recording: &str,
    options: &ProcessOptions,
) -> Result<(PipelineSettings, Vec<DetectionEvent>, Vec<LocationSample>)> {
    let detection_path = detections_path_for(metadata_path);
    if !detection_path.is_file() {
        return Err(Error::DetectionFileNotFound {
            metadata_path: metadata_path.to_path_buf(),
            detection_path,
        });
    }
    let events = parse_detection_file(&detection_path)?;
    debug!(
        "[{}] Loaded {} detections from {}",
        recording,
        events.len(),
        detection_path.display()
    );

    let settings = options.settings_for(metadata)?;
    debug!(
        "[{}] fps={}, interval={} ms, window={} ms, metric={}",
        recording,
        settings.alignment.fps,
        settings.alignment.location_interval_ms,
        settings.alignment.window_ms(),
        settings.clustering.metric
    );

    let samples = metadata.to_samples()?;
    Ok((settings, events, samples))
}

/// Apply status edits to a stored report, recompute its clusters and
/// rewrite it along with any other requested formats.
///
/// The report's own clustering settings are reused.
pub fn recluster_report(
    report_path: &Path,
    updates: &[(DetectionId, DetectionStatus)],
    formats: &[OutputFormat],
) -> Result<RecordingReport> {
    let mut report = load_report(report_path)?;

    let changed = report.apply_status_updates(updates)?;
    info!(
        "[{}] {} of {} status update(s) changed a detection",
        report.recording,
        changed,
        updates.len()
    );

    let clusterer = SpatialClusterer::new(report.settings.clustering)?;
    report.recluster(&clusterer);

    let metadata_path = metadata_path_for_report(report_path);
    let output_dir = report_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    for format in formats {
        let output_path = match format {
            OutputFormat::Json => report_path.to_path_buf(),
            other => output_path_for(&metadata_path, &output_dir, *other),
        };
        write_report(&report, &output_path, *format)?;
    }

    Ok(report)
}

/// Write `report` in every format into `output_dir`.
fn write_outputs(
    report: &RecordingReport,
    metadata_path: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
) -> Result<Vec<PathBuf>> {
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir).map_err(|e| Error::OutputDirCreateFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
    }

    formats
        .iter()
        .map(|format| {
            let output_path = output_path_for(metadata_path, output_dir, *format);
            write_report(report, &output_path, *format)?;
            Ok(output_path)
        })
        .collect()
}

/// Write a report to an output file.
pub fn write_report(report: &RecordingReport, output_path: &Path, format: OutputFormat) -> Result<()> {
    debug!("Writing {} output: {}", format, output_path.display());

    let mut writer: Box<dyn OutputWriter> = match format {
        OutputFormat::Json => Box::new(JsonReportWriter::new(
            output_path,
            &report.recording,
            report.status,
            report.settings,
        )),
        OutputFormat::Csv => Box::new(CsvWriter::new(output_path)?),
        OutputFormat::Geojson => Box::new(GeoJsonWriter::new(output_path, &report.recording)),
    };

    writer.write_header()?;
    for cluster in &report.clusters {
        writer.write_cluster(cluster)?;
    }
    for detection in report.all_detections() {
        writer.write_detection(detection)?;
    }
    writer.finalize(&report.summary)?;

    Ok(())
}

/// Recording identifier: the video name if the metadata has one, else the
/// metadata file stem.
fn recording_id(metadata_path: &Path, metadata: &RecordingMetadata) -> String {
    metadata
        .video_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(
            || {
                metadata_path
                    .file_stem()
                    .map_or_else(|| "recording".to_string(), |s| s.to_string_lossy().into_owned())
            },
            str::to_string,
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::ProcessingStatus;
    use tempfile::tempdir;

    const METADATA: &str = r#"{
        "video_name": "walk.mp4",
        "location_update_interval_ms": 1000,
        "location_data": [
            {"frame_number": 0, "relative_time_ms": 0, "latitude": 60.0, "longitude": 24.0},
            {"frame_number": 150, "relative_time_ms": 5000, "latitude": 60.0001, "longitude": 24.0001},
            {"frame_number": 300, "relative_time_ms": 10000, "latitude": 61.0, "longitude": 25.0}
        ]
    }"#;

    const DETECTIONS: &str = "frame_number,confidence,class_label\n\
        0,0.9,bottle\n\
        150,0.8,can\n\
        300,0.7,bottle\n\
        3000,0.6,bag\n";

    fn options() -> ProcessOptions {
        let mut options = ProcessOptions::from_config(&Config::default());
        options.progress = false;
        options.formats = vec![OutputFormat::Json, OutputFormat::Csv, OutputFormat::Geojson];
        options
    }

    #[test]
    fn test_process_recording_writes_outputs() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("walk.json");
        std::fs::write(&metadata_path, METADATA).unwrap();
        std::fs::write(dir.path().join("walk.detections.csv"), DETECTIONS).unwrap();

        let result = process_recording(
            &metadata_path,
            dir.path(),
            &options(),
            &CancelFlag::new(),
            &MultiProgress::new(),
        )
        .unwrap();

        assert_eq!(result.recording, "walk.mp4");
        assert_eq!(result.summary.detections_created, 3);
        assert_eq!(result.summary.detections_unresolved, 1);
        assert_eq!(result.summary.clusters_created, 2);
        assert_eq!(result.outputs.len(), 3);
        assert!(result.outputs.iter().all(|p| p.exists()));

        let report = load_report(&dir.path().join("walk.geoalign.json")).unwrap();
        assert_eq!(report.status, ProcessingStatus::Completed);
    }

    #[test]
    fn test_missing_detection_file() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("walk.json");
        std::fs::write(&metadata_path, METADATA).unwrap();

        let err = process_recording(
            &metadata_path,
            dir.path(),
            &options(),
            &CancelFlag::new(),
            &MultiProgress::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::PipelineFailed { ref recording, ref source }
                if recording == "walk.mp4" && matches!(**source, Error::DetectionFileNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_detection_file_fails_recording() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("walk.json");
        std::fs::write(&metadata_path, METADATA).unwrap();
        std::fs::write(
            dir.path().join("walk.detections.csv"),
            "frame_number,confidence\n0,1.5\n",
        )
        .unwrap();

        let err = process_recording(
            &metadata_path,
            dir.path(),
            &options(),
            &CancelFlag::new(),
            &MultiProgress::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::PipelineFailed { ref recording, ref source }
                if recording == "walk.mp4" && matches!(**source, Error::InvalidDetectionFormat { .. })
        ));
        assert!(err.is_invalid_input());
        assert!(!dir.path().join("walk.geoalign.json").exists());
    }

    #[test]
    fn test_negative_time_fails_recording() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("bad.json");
        std::fs::write(
            &metadata_path,
            r#"{"location_data": [{"frame_number": 1, "relative_time_ms": -5}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.detections.csv"), DETECTIONS).unwrap();

        let err = process_recording(
            &metadata_path,
            dir.path(),
            &options(),
            &CancelFlag::new(),
            &MultiProgress::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PipelineFailed { ref recording, .. } if recording == "bad"));
        assert!(err.is_invalid_input());
        assert!(!dir.path().join("bad.geoalign.json").exists());
    }

    #[test]
    fn test_recluster_report() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("walk.json");
        std::fs::write(&metadata_path, METADATA).unwrap();
        std::fs::write(dir.path().join("walk.detections.csv"), DETECTIONS).unwrap();
        process_recording(
            &metadata_path,
            dir.path(),
            &options(),
            &CancelFlag::new(),
            &MultiProgress::new(),
        )
        .unwrap();

        let report_path = dir.path().join("walk.geoalign.json");
        let report = recluster_report(
            &report_path,
            &[(DetectionId::new(150, 0), DetectionStatus::Cleaned)],
            &[OutputFormat::Json, OutputFormat::Geojson],
        )
        .unwrap();
        assert_eq!(report.clusters[0].cleaned_count, 1);

        let reloaded = load_report(&report_path).unwrap();
        assert_eq!(reloaded.clusters[0].cleaned_count, 1);
        assert_eq!(reloaded.clusters[0].pending_count, 1);
        assert!(dir.path().join("walk.geoalign.geojson").exists());
    }

    #[test]
    fn test_recording_id_fallback() {
        let metadata = RecordingMetadata {
            video_name: Some("  ".to_string()),
            ..RecordingMetadata::default()
        };
        assert_eq!(recording_id(Path::new("/x/walk.json"), &metadata), "walk");
    }
}
