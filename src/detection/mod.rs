//! Detection events from the external model and their geotagged form.
//!
//! The detection model itself is a collaborator outside this crate: it is
//! represented only by the [`DetectionSource`] trait, which hands over one
//! frame's results at a time.

mod event;
mod geotagged;
mod parser;
mod source;
mod throttle;

pub use event::{BoundingBox, DetectionEvent, DetectionId};
pub use geotagged::{DetectionStatus, GeotaggedDetection, ResolvedLocation};
pub use parser::{parse_detection_file, parse_detection_reader};
pub use source::{DetectionSource, FrameDetections, MemorySource};
pub use throttle::FrameThrottle;
