//! CSV output format writer.

use crate::cluster::Cluster;
use crate::constants::COORDINATE_DECIMAL_PLACES;
use crate::constants::confidence::DECIMAL_PLACES;
use crate::detection::{DetectionId, GeotaggedDetection};
use crate::error::Result;
use crate::output::OutputWriter;
use crate::pipeline::RecordingSummary;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row per detection, with its cluster when resolved.
pub struct CsvWriter {
    writer: BufWriter<File>,
    cluster_of: HashMap<DetectionId, usize>,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            cluster_of: HashMap::new(),
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        writeln!(
            self.writer,
            "frame_number,detection_index,confidence,class_label,elapsed_ms,status,latitude,longitude,sample_frame,offset_ms,cluster_id"
        )?;
        Ok(())
    }

    fn write_cluster(&mut self, cluster: &Cluster) -> Result<()> {
        for member in &cluster.members {
            self.cluster_of.insert(*member, cluster.cluster_id);
        }
        Ok(())
    }

    fn write_detection(&mut self, detection: &GeotaggedDetection) -> Result<()> {
        let event = &detection.event;
        write!(
            self.writer,
            "{},{},{:.decimal$},{},{:.1},{}",
            event.frame_number,
            event.detection_index,
            event.confidence,
            escape_csv(event.class_label.as_deref().unwrap_or_default()),
            detection.elapsed_ms,
            detection.status,
            decimal = DECIMAL_PLACES,
        )?;

        // Unresolved detections leave the location columns empty.
        match &detection.location {
            Some(location) => write!(
                self.writer,
                ",{:.places$},{:.places$},{},{:.1}",
                location.latitude,
                location.longitude,
                location.sample_frame,
                location.offset_ms,
                places = COORDINATE_DECIMAL_PLACES,
            )?,
            None => write!(self.writer, ",,,,")?,
        }

        write!(self.writer, ",")?;
        if let Some(cluster_id) = self.cluster_of.get(&detection.id()) {
            write!(self.writer, "{cluster_id}")?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn finalize(&mut self, _summary: &RecordingSummary) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Escape a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
