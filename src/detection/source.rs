//! Frame-by-frame detection input.

use super::DetectionEvent;
use crate::error::Result;

/// Detections the model produced on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDetections {
    /// Frame index.
    pub frame_number: u64,
    /// Objects found on the frame. May be empty.
    pub detections: Vec<DetectionEvent>,
}

/// External detection collaborator.
///
/// Implementations wrap a video decoder plus model, or replay stored
/// results. Each call may block on I/O or inference; the pipeline checks for
/// cancellation between calls. Frames must come in non-decreasing order.
pub trait DetectionSource {
    /// Next frame's detections, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<FrameDetections>>;

    /// Number of frames still to come, if known. Used for progress only.
    fn remaining_hint(&self) -> Option<usize> {
        None
    }
}

/// Replays detections held in memory, grouped by frame.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: std::collections::VecDeque<FrameDetections>,
}

impl MemorySource {
    /// Group `events` by frame, in frame order.
    ///
    /// Within a frame, events keep their `detection_index` order.
    pub fn new(mut events: Vec<DetectionEvent>) -> Self {
        events.sort_by_key(DetectionEvent::id);

        let mut frames: std::collections::VecDeque<FrameDetections> =
            std::collections::VecDeque::new();
        for event in events {
            match frames.back_mut() {
                Some(frame) if frame.frame_number == event.frame_number => {
                    frame.detections.push(event);
                }
                _ => frames.push_back(FrameDetections {
                    frame_number: event.frame_number,
                    detections: vec![event],
                }),
            }
        }

        Self { frames }
    }

    /// Total number of events still queued.
    pub fn event_count(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }
}

impl DetectionSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<FrameDetections>> {
        Ok(self.frames.pop_front())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }
}
