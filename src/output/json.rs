//! JSON report writer.

use crate::cluster::Cluster;
use crate::detection::GeotaggedDetection;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use crate::pipeline::{PipelineSettings, ProcessingStatus, RecordingReport, RecordingSummary};
use chrono::Utc;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes the full [`RecordingReport`] as pretty-printed JSON.
///
/// The file can be read back with
/// [`load_report`](crate::pipeline::load_report).
pub struct JsonReportWriter {
    output_path: PathBuf,
    recording: String,
    status: ProcessingStatus,
    settings: PipelineSettings,
    detections: Vec<GeotaggedDetection>,
    unresolved: Vec<GeotaggedDetection>,
    clusters: Vec<Cluster>,
}

impl JsonReportWriter {
    /// Create a new JSON report writer.
    pub fn new(
        output_path: &Path,
        recording: &str,
        status: ProcessingStatus,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            recording: recording.to_string(),
            status,
            settings,
            detections: Vec::new(),
            unresolved: Vec::new(),
            clusters: Vec::new(),
        }
    }
}

impl OutputWriter for JsonReportWriter {
    fn write_header(&mut self) -> Result<()> {
        // No header for JSON - written at finalize
        Ok(())
    }

    fn write_cluster(&mut self, cluster: &Cluster) -> Result<()> {
        self.clusters.push(cluster.clone());
        Ok(())
    }

    fn write_detection(&mut self, detection: &GeotaggedDetection) -> Result<()> {
        if detection.is_resolved() {
            self.detections.push(detection.clone());
        } else {
            self.unresolved.push(detection.clone());
        }
        Ok(())
    }

    fn finalize(&mut self, summary: &RecordingSummary) -> Result<()> {
        let report = RecordingReport {
            recording: self.recording.clone(),
            status: self.status,
            generated_at: Utc::now(),
            settings: self.settings,
            summary: *summary,
            detections: std::mem::take(&mut self.detections),
            unresolved: std::mem::take(&mut self.unresolved),
            clusters: std::mem::take(&mut self.clusters),
        };

        let file = File::create(&self.output_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &report).map_err(|e| Error::JsonWrite {
            path: self.output_path.clone(),
            source: e,
        })?;

        Ok(())
    }
}
