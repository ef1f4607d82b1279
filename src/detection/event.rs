//! Raw detection events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a detection within one recording.
///
/// Ordered by frame, then by ordinal within the frame. Re-running a
/// recording produces the same keys, so stores keyed on them overwrite
/// rather than duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetectionId {
    /// Frame the detection was produced on.
    pub frame_number: u64,
    /// Ordinal within the frame.
    pub detection_index: u32,
}

impl DetectionId {
    /// Create a detection key.
    pub const fn new(frame_number: u64, detection_index: u32) -> Self {
        Self {
            frame_number,
            detection_index,
        }
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.frame_number, self.detection_index)
    }
}

impl FromStr for DetectionId {
    type Err = String;

    /// Parse `FRAME:INDEX`, or a bare `FRAME` meaning index 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (frame, index) = s.split_once(':').unwrap_or((s, "0"));
        let frame_number = frame
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a valid detection id (expected FRAME:INDEX)"))?;
        let detection_index = index
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a valid detection id (expected FRAME:INDEX)"))?;
        Ok(Self::new(frame_number, detection_index))
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// One object found by the detection model on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Frame the object was found on.
    pub frame_number: u64,
    /// Ordinal within the frame.
    pub detection_index: u32,
    /// Model confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Class label, if the model reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    /// Bounding box, if the model reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl DetectionEvent {
    /// Create an event without label or box.
    pub fn new(frame_number: u64, detection_index: u32, confidence: f32) -> Self {
        Self {
            frame_number,
            detection_index,
            confidence,
            class_label: None,
            bounding_box: None,
        }
    }

    /// Attach a class label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }

    /// Key of this event within its recording.
    pub const fn id(&self) -> DetectionId {
        DetectionId::new(self.frame_number, self.detection_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_id_ordering() {
        let mut ids = vec![
            DetectionId::new(30, 1),
            DetectionId::new(2, 5),
            DetectionId::new(30, 0),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                DetectionId::new(2, 5),
                DetectionId::new(30, 0),
                DetectionId::new(30, 1)
            ]
        );
    }

    #[test]
    fn test_detection_id_parse() {
        assert_eq!("150:2".parse::<DetectionId>(), Ok(DetectionId::new(150, 2)));
        assert_eq!("150".parse::<DetectionId>(), Ok(DetectionId::new(150, 0)));
        assert!("x:1".parse::<DetectionId>().is_err());
        assert!("1:-1".parse::<DetectionId>().is_err());
    }

    #[test]
    fn test_detection_id_display() {
        assert_eq!(DetectionId::new(7, 3).to_string(), "7:3");
    }

    #[test]
    fn test_event_id_and_label() {
        let event = DetectionEvent::new(90, 1, 0.8).with_label("plastic_bottle");
        assert_eq!(event.id(), DetectionId::new(90, 1));
        assert_eq!(event.class_label.as_deref(), Some("plastic_bottle"));
    }
}
