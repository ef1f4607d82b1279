//! Temporal aligner.

use crate::constants::{DEFAULT_ACCEPTANCE_MULTIPLIER, DEFAULT_FPS, DEFAULT_LOCATION_INTERVAL_MS};
use crate::detection::{DetectionEvent, DetectionStatus, GeotaggedDetection, ResolvedLocation};
use crate::error::{Error, Result};
use crate::location::{LocationSample, LocationTimeline};
use serde::{Deserialize, Serialize};

/// Parameters that decide whether a GPS fix is close enough to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPolicy {
    /// Nominal video frame rate in Hz.
    pub fps: f64,
    /// Nominal GPS sampling period in milliseconds.
    pub location_interval_ms: u64,
    /// Multiplier applied to the sampling period for the match window.
    pub acceptance_multiplier: f64,
}

impl AlignmentPolicy {
    /// Create a validated policy.
    pub fn new(fps: f64, location_interval_ms: u64, acceptance_multiplier: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::InvalidFrameRate { value: fps });
        }
        if location_interval_ms == 0 {
            return Err(Error::InvalidLocationInterval {
                value: location_interval_ms,
            });
        }
        if !acceptance_multiplier.is_finite() || acceptance_multiplier <= 0.0 {
            return Err(Error::InvalidAcceptanceMultiplier {
                value: acceptance_multiplier,
            });
        }

        Ok(Self {
            fps,
            location_interval_ms,
            acceptance_multiplier,
        })
    }

    /// Largest accepted distance between a frame and its fix, in milliseconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn window_ms(&self) -> f64 {
        self.location_interval_ms as f64 * self.acceptance_multiplier
    }

    /// Elapsed time of `frame_number`, assuming a constant frame rate and no
    /// dropped frames.
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_ms(&self, frame_number: u64) -> f64 {
        (frame_number as f64 / self.fps) * 1000.0
    }
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            location_interval_ms: DEFAULT_LOCATION_INTERVAL_MS,
            acceptance_multiplier: DEFAULT_ACCEPTANCE_MULTIPLIER,
        }
    }
}

/// Outcome of looking up one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// A fix inside the window.
    Matched {
        /// The matched fix.
        sample: &'a LocationSample,
        /// Elapsed time of the frame.
        elapsed_ms: f64,
    },
    /// No fix inside the window. A normal outcome, not an error.
    NoMatch {
        /// Elapsed time of the frame.
        elapsed_ms: f64,
        /// Distance to the nearest fix, if the timeline has any.
        nearest_gap_ms: Option<f64>,
    },
}

impl Resolution<'_> {
    /// Elapsed time of the frame.
    pub const fn elapsed_ms(&self) -> f64 {
        match self {
            Self::Matched { elapsed_ms, .. } | Self::NoMatch { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    /// Whether a fix was accepted.
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Resolves detections to GPS fixes under an [`AlignmentPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalAligner {
    policy: AlignmentPolicy,
}

impl TemporalAligner {
    /// Create an aligner.
    pub const fn new(policy: AlignmentPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    pub const fn policy(&self) -> &AlignmentPolicy {
        &self.policy
    }

    /// Look up the fix for `frame_number`.
    pub fn resolve<'a>(&self, frame_number: u64, timeline: &'a LocationTimeline) -> Resolution<'a> {
        let elapsed_ms = self.policy.elapsed_ms(frame_number);

        match timeline.nearest(elapsed_ms) {
            Some(sample) if sample.time_distance_ms(elapsed_ms) <= self.policy.window_ms() => {
                Resolution::Matched { sample, elapsed_ms }
            }
            nearest => Resolution::NoMatch {
                elapsed_ms,
                nearest_gap_ms: nearest.map(|s| s.time_distance_ms(elapsed_ms)),
            },
        }
    }

    /// Geotag `event`. Unresolved events come back with no location.
    pub fn align(&self, event: DetectionEvent, timeline: &LocationTimeline) -> GeotaggedDetection {
        let resolution = self.resolve(event.frame_number, timeline);
        let elapsed_ms = resolution.elapsed_ms();
        let location = match resolution {
            Resolution::Matched { sample, elapsed_ms } => {
                Some(ResolvedLocation::from_sample(sample, elapsed_ms))
            }
            Resolution::NoMatch { .. } => None,
        };

        GeotaggedDetection {
            event,
            elapsed_ms,
            location,
            status: DetectionStatus::Pending,
        }
    }
}
