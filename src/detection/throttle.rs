//! Suppression of near-duplicate detections on consecutive frames.

/// Drops frames that follow an accepted frame too closely.
///
/// A moving camera sees the same object on many consecutive frames. With
/// `min_frame_gap = 30`, a 30 fps video keeps at most one detecting frame per
/// second. A gap of 0 or 1 keeps every frame.
#[derive(Debug, Clone, Default)]
pub struct FrameThrottle {
    min_frame_gap: u64,
    last_accepted: Option<u64>,
}

impl FrameThrottle {
    /// Create a throttle with the given minimum gap in frames.
    pub const fn new(min_frame_gap: u64) -> Self {
        Self {
            min_frame_gap,
            last_accepted: None,
        }
    }

    /// Whether `frame_number` should be kept. Kept frames reset the gap.
    pub fn accept(&mut self, frame_number: u64) -> bool {
        let keep = self
            .last_accepted
            .is_none_or(|last| frame_number.saturating_sub(last) >= self.min_frame_gap);
        if keep {
            self.last_accepted = Some(frame_number);
        }
        keep
    }
}
