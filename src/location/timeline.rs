//! Nearest-in-time index over a recording's GPS fixes.

use super::LocationSample;
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Sorted, queryable index over the GPS fixes of one recording.
///
/// The timeline is a pure nearest-neighbour index: it never applies an
/// acceptance window. That policy belongs to
/// [`TemporalAligner`](crate::align::TemporalAligner).
#[derive(Debug, Clone, Default)]
pub struct LocationTimeline {
    /// Sorted by `(relative_time_ms, frame_number)`.
    samples: Vec<LocationSample>,
}

impl LocationTimeline {
    /// Build a timeline from an unordered collection of samples.
    ///
    /// Fails on an empty collection, a repeated `frame_number`, or a sample
    /// with coordinates outside the valid range.
    pub fn new(samples: Vec<LocationSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyLocationData);
        }

        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            sample.validate()?;
            if !seen.insert(sample.frame_number) {
                return Err(Error::DuplicateSampleFrame {
                    frame_number: sample.frame_number,
                });
            }
        }

        let mut samples = samples;
        samples.sort_by_key(|s| (s.relative_time_ms, s.frame_number));

        Ok(Self { samples })
    }

    /// A timeline with no samples. Every query reports no match.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the timeline has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in time order.
    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    /// Time covered from the first to the last fix, in milliseconds.
    pub fn span_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.relative_time_ms - first.relative_time_ms,
            _ => 0,
        }
    }

    /// Sample closest in time to `elapsed_ms`.
    ///
    /// Ties go to the earlier sample; samples sharing a timestamp resolve to
    /// the lowest frame number. Runs in O(log n).
    pub fn nearest(&self, elapsed_ms: f64) -> Option<&LocationSample> {
        #[allow(clippy::cast_precision_loss)]
        let idx = self
            .samples
            .partition_point(|s| (s.relative_time_ms as f64) < elapsed_ms);

        let before = idx
            .checked_sub(1)
            .and_then(|i| self.samples.get(i))
            .map(|b| self.first_at(b.relative_time_ms));
        let after = self.samples.get(idx);

        match (before, after) {
            (Some(b), Some(a)) => {
                if a.time_distance_ms(elapsed_ms) < b.time_distance_ms(elapsed_ms) {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }

    /// First sample (lowest frame) carrying exactly `relative_time_ms`.
    fn first_at(&self, relative_time_ms: u64) -> &LocationSample {
        let idx = self
            .samples
            .partition_point(|s| s.relative_time_ms < relative_time_ms);
        &self.samples[idx]
    }
}
