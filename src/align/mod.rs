//! Frame-to-location alignment.
//!
//! Maps a detection's frame index to elapsed recording time and looks up the
//! nearest GPS fix under an acceptance window. Alignment is pure: the same
//! inputs always produce the same match.

mod aligner;

pub use aligner::{AlignmentPolicy, Resolution, TemporalAligner};
