//! Per-recording results handed to storage and output writers.

use super::{PipelineSettings, ProcessingStatus};
use crate::cluster::{Cluster, SpatialClusterer};
use crate::detection::{DetectionId, DetectionStatus, GeotaggedDetection};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Counts reported back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSummary {
    /// Detections that resolved to a location.
    pub detections_created: usize,
    /// Detections with no fix inside the acceptance window.
    pub detections_unresolved: usize,
    /// GPS fixes in the recording's timeline.
    pub location_samples_used: usize,
    /// Distinct fixes matched by at least one detection.
    pub distinct_samples_matched: usize,
    /// Clusters in the current cluster set.
    pub clusters_created: usize,
    /// Frames read from the detection source.
    pub frames_processed: usize,
    /// Detecting frames dropped by the frame-gap throttle.
    pub frames_throttled: usize,
    /// Detections dropped by the confidence filter.
    pub detections_below_confidence: usize,
}

/// Everything produced for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingReport {
    /// Recording identifier.
    pub recording: String,
    /// Final status of the run.
    pub status: ProcessingStatus,
    /// When this report (or its latest cluster set) was produced.
    pub generated_at: DateTime<Utc>,
    /// Settings the run used.
    pub settings: PipelineSettings,
    /// Counts.
    pub summary: RecordingSummary,
    /// Resolved detections in frame order.
    pub detections: Vec<GeotaggedDetection>,
    /// Unresolved detections in frame order.
    #[serde(default)]
    pub unresolved: Vec<GeotaggedDetection>,
    /// Current cluster set.
    pub clusters: Vec<Cluster>,
}

impl RecordingReport {
    /// Every detection, resolved first.
    pub fn all_detections(&self) -> impl Iterator<Item = &GeotaggedDetection> {
        self.detections.iter().chain(&self.unresolved)
    }

    /// Set detection statuses. Returns how many actually changed.
    ///
    /// Either every update applies or none does: an id that is not in the
    /// report fails the whole batch with [`Error::UnknownDetection`].
    /// Clusters are left untouched; call [`Self::recluster`] afterwards.
    pub fn apply_status_updates(
        &mut self,
        updates: &[(DetectionId, DetectionStatus)],
    ) -> Result<usize> {
        let positions: HashMap<DetectionId, (bool, usize)> = self
            .detections
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id(), (true, i)))
            .chain(
                self.unresolved
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (d.id(), (false, i))),
            )
            .collect();

        let mut targets = Vec::with_capacity(updates.len());
        for &(id, status) in updates {
            let position = positions.get(&id).ok_or(Error::UnknownDetection {
                frame_number: id.frame_number,
                detection_index: id.detection_index,
            })?;
            targets.push((*position, status));
        }

        let mut changed = 0;
        for ((resolved, index), status) in targets {
            let detection = if resolved {
                &mut self.detections[index]
            } else {
                &mut self.unresolved[index]
            };
            if detection.status != status {
                detection.set_status(status);
                changed += 1;
            }
        }

        Ok(changed)
    }

    /// Replace the cluster set with a full recomputation over the current
    /// statuses.
    pub fn recluster(&mut self, clusterer: &SpatialClusterer) {
        self.clusters = clusterer.cluster(&self.detections);
        self.summary.clusters_created = self.clusters.len();
        self.generated_at = Utc::now();
        info!(
            "[{}] Re-clustered {} detections into {} clusters",
            self.recording,
            self.detections.len(),
            self.clusters.len()
        );
    }

    /// Number of detections with the given status.
    pub fn count_with_status(&self, status: DetectionStatus) -> usize {
        self.all_detections().filter(|d| d.status == status).count()
    }
}

/// Read a report previously written as JSON.
pub fn load_report(path: &Path) -> Result<RecordingReport> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| Error::ReportRead {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detection::{DetectionEvent, ResolvedLocation};

    fn resolved(frame: u64, lat: f64) -> GeotaggedDetection {
        GeotaggedDetection {
            event: DetectionEvent::new(frame, 0, 0.8),
            elapsed_ms: 0.0,
            location: Some(ResolvedLocation {
                latitude: lat,
                longitude: 24.0,
                sample_frame: frame,
                sample_time_ms: 0,
                offset_ms: 0.0,
                accuracy: None,
            }),
            status: DetectionStatus::Pending,
        }
    }

    fn report() -> RecordingReport {
        let mut unresolved = resolved(900, 0.0);
        unresolved.location = None;

        let mut report = RecordingReport {
            recording: "walk".to_string(),
            status: ProcessingStatus::Completed,
            generated_at: Utc::now(),
            settings: PipelineSettings::default(),
            summary: RecordingSummary::default(),
            detections: vec![resolved(0, 60.0), resolved(30, 60.0001), resolved(60, 61.0)],
            unresolved: vec![unresolved],
            clusters: Vec::new(),
        };
        report.recluster(&SpatialClusterer::default());
        report
    }

    #[test]
    fn test_recluster_refreshes_counts() {
        let mut report = report();
        assert_eq!(report.summary.clusters_created, 2);
        assert_eq!(report.clusters[0].pending_count, 2);

        let changed = report
            .apply_status_updates(&[(DetectionId::new(30, 0), DetectionStatus::Cleaned)])
            .unwrap();
        assert_eq!(changed, 1);
        // Not refreshed until asked.
        assert_eq!(report.clusters[0].cleaned_count, 0);

        report.recluster(&SpatialClusterer::default());
        assert_eq!(report.clusters[0].cleaned_count, 1);
        assert_eq!(report.clusters[0].pending_count, 1);
    }

    #[test]
    fn test_unknown_id_rejects_whole_batch() {
        let mut report = report();
        let result = report.apply_status_updates(&[
            (DetectionId::new(0, 0), DetectionStatus::Cleaned),
            (DetectionId::new(5, 2), DetectionStatus::Cleaned),
        ]);
        assert!(matches!(
            result,
            Err(Error::UnknownDetection {
                frame_number: 5,
                detection_index: 2
            })
        ));
        assert_eq!(report.count_with_status(DetectionStatus::Cleaned), 0);
    }

    #[test]
    fn test_unresolved_status_is_editable() {
        let mut report = report();
        report
            .apply_status_updates(&[(DetectionId::new(900, 0), DetectionStatus::Cleaned)])
            .unwrap();
        assert_eq!(report.unresolved[0].status, DetectionStatus::Cleaned);
    }

    #[test]
    fn test_repeated_update_counts_once() {
        let mut report = report();
        let id = DetectionId::new(0, 0);
        let changed = report
            .apply_status_updates(&[
                (id, DetectionStatus::Cleaned),
                (id, DetectionStatus::Cleaned),
            ])
            .unwrap();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_load_report_round_trip() {
        let report = report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.geoalign.json");
        std::fs::write(&path, serde_json::to_string_pretty(&report).unwrap()).unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded.recording, report.recording);
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.unresolved.len(), 1);
        assert_eq!(loaded.clusters[1].members, report.clusters[1].members);
    }

    #[test]
    fn test_load_report_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_report(&path), Err(Error::ReportRead { .. })));
    }
}
