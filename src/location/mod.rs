//! GPS fixes for one recording and the time index over them.

mod metadata;
mod sample;
mod timeline;

pub use metadata::{LocationRecord, RecordingMetadata, load_metadata};
pub use sample::LocationSample;
pub use timeline::LocationTimeline;
