//! Per-recording alignment pipeline.

use super::{ProcessingStatus, RecordingReport, RecordingSummary};
use crate::align::{AlignmentPolicy, TemporalAligner};
use crate::cluster::{Cluster, ClusterSettings, SpatialClusterer};
use crate::detection::{DetectionId, DetectionSource, FrameThrottle, GeotaggedDetection};
use crate::error::{Error, Result};
use crate::location::{LocationSample, LocationTimeline};
use crate::output::progress;
use chrono::Utc;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

/// Settings for one recording's run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Frame-to-time mapping and acceptance window.
    pub alignment: AlignmentPolicy,
    /// Clustering thresholds.
    pub clustering: ClusterSettings,
    /// Detections below this confidence are dropped before alignment.
    pub min_confidence: f32,
    /// Minimum frames between kept detecting frames (0 keeps all).
    pub min_frame_gap: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            alignment: AlignmentPolicy::default(),
            clustering: ClusterSettings::default(),
            min_confidence: 0.0,
            min_frame_gap: 0,
        }
    }
}

/// Shared cancellation signal, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one recording from raw inputs to a [`RecordingReport`].
///
/// A pipeline runs once. After a failure the detections collected so far
/// stay readable through [`Self::detections`]; nothing is rolled back.
#[derive(Debug)]
pub struct AlignmentPipeline {
    recording: String,
    settings: PipelineSettings,
    status: ProcessingStatus,
    summary: RecordingSummary,
    detections: Vec<GeotaggedDetection>,
    clusters: Vec<Cluster>,
    progress: Option<ProgressBar>,
}

impl AlignmentPipeline {
    /// Create a pending pipeline for `recording`.
    pub fn new(recording: impl Into<String>, settings: PipelineSettings) -> Self {
        Self {
            recording: recording.into(),
            settings,
            status: ProcessingStatus::Pending,
            summary: RecordingSummary::default(),
            detections: Vec::new(),
            clusters: Vec::new(),
            progress: None,
        }
    }

    /// Tick `bar` once per frame read.
    #[must_use]
    pub fn with_progress(mut self, bar: Option<ProgressBar>) -> Self {
        self.progress = bar;
        self
    }

    /// Recording identifier.
    pub fn recording(&self) -> &str {
        &self.recording
    }

    /// Current status.
    pub const fn status(&self) -> ProcessingStatus {
        self.status
    }

    /// Settings in use.
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Counts so far.
    pub const fn summary(&self) -> &RecordingSummary {
        &self.summary
    }

    /// Detections collected so far, in frame order.
    pub fn detections(&self) -> &[GeotaggedDetection] {
        &self.detections
    }

    /// Run the pipeline to completion.
    ///
    /// Only a pending pipeline can run; anything else is
    /// [`Error::InvalidTransition`] and leaves the state alone. Any error
    /// raised while processing moves the pipeline to `failed` and comes
    /// back wrapped in [`Error::PipelineFailed`].
    pub fn run(
        &mut self,
        samples: Vec<LocationSample>,
        source: &mut dyn DetectionSource,
        cancel: &CancelFlag,
    ) -> Result<RecordingReport> {
        self.status = self.status.transition_to(ProcessingStatus::Processing)?;
        info!("[{}] Processing started", self.recording);
        let start_time = Instant::now();

        match self.process(samples, source, cancel) {
            Ok(()) => {
                self.status = self.status.transition_to(ProcessingStatus::Completed)?;
                info!(
                    "[{}] Completed in {:.2}s: {} detections created, {} unresolved, {} location samples, {} clusters",
                    self.recording,
                    start_time.elapsed().as_secs_f64(),
                    self.summary.detections_created,
                    self.summary.detections_unresolved,
                    self.summary.location_samples_used,
                    self.summary.clusters_created
                );
                Ok(self.report())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fail a run whose inputs could not even be prepared.
    ///
    /// Moves a pending pipeline through `processing` to `failed` and returns
    /// the wrapped error.
    pub fn abort(&mut self, error: Error) -> Error {
        match self.status.transition_to(ProcessingStatus::Processing) {
            Ok(status) => {
                self.status = status;
                self.fail(error)
            }
            Err(e) => e,
        }
    }

    /// Snapshot of the current state as a report.
    pub fn report(&self) -> RecordingReport {
        let (detections, unresolved): (Vec<_>, Vec<_>) = self
            .detections
            .iter()
            .cloned()
            .partition(GeotaggedDetection::is_resolved);

        RecordingReport {
            recording: self.recording.clone(),
            status: self.status,
            generated_at: Utc::now(),
            settings: self.settings,
            summary: self.summary,
            detections,
            unresolved,
            clusters: self.clusters.clone(),
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        if let Ok(status) = self.status.transition_to(ProcessingStatus::Failed) {
            self.status = status;
        }
        error!(
            "[{}] Processing failed after {} frames ({} detections kept): {}",
            self.recording,
            self.summary.frames_processed,
            self.detections.len(),
            error
        );
        error.in_recording(&self.recording)
    }

    fn process(
        &mut self,
        samples: Vec<LocationSample>,
        source: &mut dyn DetectionSource,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let clusterer = SpatialClusterer::new(self.settings.clustering)?;
        let aligner = TemporalAligner::new(self.settings.alignment);

        // An empty location set only matters once a detection needs it.
        let timeline = if samples.is_empty() {
            LocationTimeline::empty()
        } else {
            LocationTimeline::new(samples)?
        };
        self.summary.location_samples_used = timeline.len();
        debug!(
            "[{}] Timeline: {} samples over {} ms, window {} ms",
            self.recording,
            timeline.len(),
            timeline.span_ms(),
            aligner.policy().window_ms()
        );

        let mut throttle = FrameThrottle::new(self.settings.min_frame_gap);
        let mut seen: HashSet<DetectionId> = HashSet::new();
        let mut matched_samples: HashSet<u64> = HashSet::new();
        let mut previous_frame: Option<u64> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };
            progress::inc_progress(self.progress.as_ref());

            if let Some(previous) = previous_frame
                && frame.frame_number < previous
            {
                return Err(Error::FrameOrder {
                    frame_number: frame.frame_number,
                    previous,
                });
            }
            previous_frame = Some(frame.frame_number);
            self.summary.frames_processed += 1;

            let min_confidence = self.settings.min_confidence;
            let before = frame.detections.len();
            let kept: Vec<_> = frame
                .detections
                .into_iter()
                .filter(|d| d.confidence >= min_confidence)
                .collect();
            self.summary.detections_below_confidence += before - kept.len();

            if kept.is_empty() {
                continue;
            }
            if !throttle.accept(frame.frame_number) {
                self.summary.frames_throttled += 1;
                continue;
            }
            if timeline.is_empty() {
                return Err(Error::EmptyLocationData);
            }

            for event in kept {
                if event.frame_number != frame.frame_number {
                    return Err(Error::DetectionSource {
                        reason: format!(
                            "detection for frame {} delivered with frame {}",
                            event.frame_number, frame.frame_number
                        ),
                    });
                }
                if !seen.insert(event.id()) {
                    return Err(Error::DuplicateDetection {
                        frame_number: event.frame_number,
                        detection_index: event.detection_index,
                    });
                }

                let detection = aligner.align(event, &timeline);
                match &detection.location {
                    Some(location) => {
                        matched_samples.insert(location.sample_frame);
                        self.summary.detections_created += 1;
                    }
                    None => {
                        self.summary.detections_unresolved += 1;
                        debug!(
                            "[{}] Detection {} at {:.0} ms has no fix within {} ms",
                            self.recording,
                            detection.id(),
                            detection.elapsed_ms,
                            aligner.policy().window_ms()
                        );
                    }
                }
                self.detections.push(detection);
            }
        }

        self.summary.distinct_samples_matched = matched_samples.len();
        self.clusters = clusterer.cluster(&self.detections);
        self.summary.clusters_created = self.clusters.len();

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::detection::{DetectionEvent, FrameDetections, MemorySource};

    fn samples() -> Vec<LocationSample> {
        vec![
            LocationSample::new(0, 0, 60.0, 24.0),
            LocationSample::new(150, 5000, 60.0001, 24.0001),
            LocationSample::new(300, 10_000, 61.0, 25.0),
        ]
    }

    /// Yields scripted frames, then an error.
    struct FailingSource {
        frames: Vec<FrameDetections>,
    }

    impl DetectionSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<FrameDetections>> {
            if self.frames.is_empty() {
                Err(Error::DetectionSource {
                    reason: "video stream unreadable".to_string(),
                })
            } else {
                Ok(Some(self.frames.remove(0)))
            }
        }
    }

    #[test]
    fn test_completed_run() {
        let mut source = MemorySource::new(vec![
            DetectionEvent::new(0, 0, 0.9),
            DetectionEvent::new(150, 0, 0.9),
            DetectionEvent::new(150, 1, 0.8),
            DetectionEvent::new(300, 0, 0.7),
            DetectionEvent::new(3000, 0, 0.7),
        ]);
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let report = pipeline.run(samples(), &mut source, &CancelFlag::new()).unwrap();

        assert_eq!(pipeline.status(), ProcessingStatus::Completed);
        assert_eq!(report.status, ProcessingStatus::Completed);
        assert_eq!(report.summary.detections_created, 4);
        assert_eq!(report.summary.detections_unresolved, 1);
        assert_eq!(report.summary.location_samples_used, 3);
        assert_eq!(report.summary.distinct_samples_matched, 3);
        assert_eq!(report.summary.clusters_created, 2);
        assert_eq!(report.summary.frames_processed, 4);
        assert_eq!(report.unresolved[0].id(), DetectionId::new(3000, 0));
    }

    #[test]
    fn test_runs_only_once() {
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        pipeline
            .run(samples(), &mut MemorySource::default(), &CancelFlag::new())
            .unwrap();
        let err = pipeline
            .run(samples(), &mut MemorySource::default(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(pipeline.status(), ProcessingStatus::Completed);
    }

    #[test]
    fn test_source_failure_keeps_partial_detections() {
        let mut source = FailingSource {
            frames: vec![FrameDetections {
                frame_number: 150,
                detections: vec![DetectionEvent::new(150, 0, 0.9)],
            }],
        };
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline
            .run(samples(), &mut source, &CancelFlag::new())
            .unwrap_err();

        assert_eq!(pipeline.status(), ProcessingStatus::Failed);
        assert_eq!(pipeline.detections().len(), 1);
        assert!(!err.is_invalid_input());
        match err {
            Error::PipelineFailed { recording, source } => {
                assert_eq!(recording, "walk");
                assert!(matches!(*source, Error::DetectionSource { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_samples_fail_only_with_detections() {
        let mut pipeline = AlignmentPipeline::new("quiet", PipelineSettings::default());
        let report = pipeline
            .run(Vec::new(), &mut MemorySource::default(), &CancelFlag::new())
            .unwrap();
        assert_eq!(report.summary.clusters_created, 0);

        let mut pipeline = AlignmentPipeline::new("busy", PipelineSettings::default());
        let mut source = MemorySource::new(vec![DetectionEvent::new(10, 0, 0.9)]);
        let err = pipeline
            .run(Vec::new(), &mut source, &CancelFlag::new())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(pipeline.status(), ProcessingStatus::Failed);
    }

    #[test]
    fn test_frame_regression_fails() {
        let mut source = FailingSource {
            frames: vec![
                FrameDetections {
                    frame_number: 150,
                    detections: Vec::new(),
                },
                FrameDetections {
                    frame_number: 100,
                    detections: Vec::new(),
                },
            ],
        };
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline
            .run(samples(), &mut source, &CancelFlag::new())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("walk"));
    }

    #[test]
    fn test_duplicate_detection_fails() {
        let mut source = FailingSource {
            frames: vec![FrameDetections {
                frame_number: 0,
                detections: vec![DetectionEvent::new(0, 0, 0.9), DetectionEvent::new(0, 0, 0.5)],
            }],
        };
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline
            .run(samples(), &mut source, &CancelFlag::new())
            .unwrap_err();
        match err {
            Error::PipelineFailed { source, .. } => {
                assert!(matches!(*source, Error::DuplicateDetection { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_first_frame() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut source = MemorySource::new(vec![DetectionEvent::new(0, 0, 0.9)]);
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline.run(samples(), &mut source, &cancel).unwrap_err();

        assert_eq!(pipeline.status(), ProcessingStatus::Failed);
        assert!(pipeline.detections().is_empty());
        assert!(matches!(
            err,
            Error::PipelineFailed { source, .. } if matches!(*source, Error::Cancelled)
        ));
    }

    #[test]
    fn test_confidence_filter_and_throttle() {
        let settings = PipelineSettings {
            min_confidence: 0.5,
            min_frame_gap: 30,
            ..PipelineSettings::default()
        };
        let mut source = MemorySource::new(vec![
            DetectionEvent::new(0, 0, 0.9),
            DetectionEvent::new(10, 0, 0.9),
            DetectionEvent::new(20, 0, 0.1),
            DetectionEvent::new(45, 0, 0.9),
        ]);
        let mut pipeline = AlignmentPipeline::new("walk", settings);
        let report = pipeline.run(samples(), &mut source, &CancelFlag::new()).unwrap();

        assert_eq!(report.summary.detections_below_confidence, 1);
        assert_eq!(report.summary.frames_throttled, 1);
        let frames: Vec<u64> = report.detections.iter().map(|d| d.event.frame_number).collect();
        assert_eq!(frames, vec![0, 45]);
    }

    #[test]
    fn test_bad_samples_fail_run() {
        let mut samples = samples();
        samples.push(LocationSample::new(150, 7000, 60.0, 24.0));
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline
            .run(samples, &mut MemorySource::default(), &CancelFlag::new())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(pipeline.status(), ProcessingStatus::Failed);
    }

    #[test]
    fn test_abort_moves_to_failed() {
        let mut pipeline = AlignmentPipeline::new("walk", PipelineSettings::default());
        let err = pipeline.abort(Error::EmptyLocationData);
        assert_eq!(pipeline.status(), ProcessingStatus::Failed);
        assert!(matches!(err, Error::PipelineFailed { .. }));
    }
}
