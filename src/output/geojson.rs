//! GeoJSON cluster map writer.

use crate::cluster::Cluster;
use crate::detection::GeotaggedDetection;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use crate::pipeline::RecordingSummary;
use serde_json::{Value, json};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes cluster centers as a GeoJSON `FeatureCollection` of points.
///
/// Coordinates follow GeoJSON order, `[longitude, latitude]`. Detections are
/// not written; the map shows clusters only.
pub struct GeoJsonWriter {
    output_path: PathBuf,
    recording: String,
    features: Vec<Value>,
}

impl GeoJsonWriter {
    /// Create a new GeoJSON writer.
    pub fn new(output_path: &Path, recording: &str) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            recording: recording.to_string(),
            features: Vec::new(),
        }
    }
}

impl OutputWriter for GeoJsonWriter {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_cluster(&mut self, cluster: &Cluster) -> Result<()> {
        self.features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [cluster.center_longitude, cluster.center_latitude],
            },
            "properties": {
                "cluster_id": cluster.cluster_id,
                "radius_meters": cluster.radius_meters,
                "member_count": cluster.member_count,
                "pending_count": cluster.pending_count,
                "cleaned_count": cluster.cleaned_count,
            },
        }));
        Ok(())
    }

    fn write_detection(&mut self, _detection: &GeotaggedDetection) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self, summary: &RecordingSummary) -> Result<()> {
        let collection = json!({
            "type": "FeatureCollection",
            "recording": self.recording,
            "detections_created": summary.detections_created,
            "features": std::mem::take(&mut self.features),
        });

        let file = File::create(&self.output_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &collection).map_err(|e| Error::JsonWrite {
            path: self.output_path.clone(),
            source: e,
        })?;

        Ok(())
    }
}
