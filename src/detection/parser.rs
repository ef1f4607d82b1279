//! Detection file parsing.
//!
//! Parses the CSV written by the detection model runner. Uses the `csv`
//! crate for robust parsing.

use super::{BoundingBox, DetectionEvent};
use crate::constants::confidence;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Internal record for CSV deserialization.
#[derive(Debug, Deserialize)]
struct DetectionRecord {
    frame_number: u64,
    confidence: f32,
    #[serde(default)]
    detection_index: Option<u32>,
    #[serde(default)]
    class_label: Option<String>,
    #[serde(default)]
    bbox_x: Option<f32>,
    #[serde(default)]
    bbox_y: Option<f32>,
    #[serde(default)]
    bbox_width: Option<f32>,
    #[serde(default)]
    bbox_height: Option<f32>,
}

/// Parse a detection file and return events in file order.
///
/// Required columns: `frame_number`, `confidence`. Optional columns:
/// `detection_index`, `class_label`, `bbox_x`, `bbox_y`, `bbox_width`,
/// `bbox_height`. A missing `detection_index` is filled with the row's
/// ordinal among rows of the same frame.
///
/// Returns `Ok(vec![])` if the file contains no detections (empty or header-only).
pub fn parse_detection_file(path: &Path) -> Result<Vec<DetectionEvent>> {
    let file = std::fs::File::open(path).map_err(|e| Error::DetectionParseFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    parse_detection_reader(file)
}

/// Parse detection CSV from any reader.
pub fn parse_detection_reader<R: Read>(reader: R) -> Result<Vec<DetectionEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut next_index: HashMap<u64, u32> = HashMap::new();
    let mut events = Vec::new();

    for (line_num, result) in reader.deserialize::<DetectionRecord>().enumerate() {
        let line = line_num + 2;
        let record = result.map_err(|e| Error::InvalidDetectionFormat {
            message: format!("line {line}: {e}"),
        })?;

        if !(confidence::MIN..=confidence::MAX).contains(&record.confidence) {
            return Err(Error::InvalidDetectionFormat {
                message: format!(
                    "line {line}: confidence must be between {} and {}, got {}",
                    confidence::MIN,
                    confidence::MAX,
                    record.confidence
                ),
            });
        }

        let bounding_box = match (
            record.bbox_x,
            record.bbox_y,
            record.bbox_width,
            record.bbox_height,
        ) {
            (Some(x), Some(y), Some(width), Some(height)) => Some(BoundingBox {
                x,
                y,
                width,
                height,
            }),
            (None, None, None, None) => None,
            _ => {
                return Err(Error::InvalidDetectionFormat {
                    message: format!("line {line}: bounding box needs all of x, y, width, height"),
                });
            }
        };

        let ordinal = next_index.entry(record.frame_number).or_insert(0);
        let detection_index = record.detection_index.unwrap_or(*ordinal);
        *ordinal = detection_index.saturating_add(1).max(*ordinal);

        events.push(DetectionEvent {
            frame_number: record.frame_number,
            detection_index,
            confidence: record.confidence,
            class_label: record.class_label.filter(|label| !label.is_empty()),
            bounding_box,
        });
    }

    Ok(events)
}
