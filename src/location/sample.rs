//! A single GPS fix.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One GPS fix recorded while filming.
///
/// Samples are immutable once a recording's metadata has been parsed and are
/// owned by the [`LocationTimeline`](super::LocationTimeline) of that recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Frame index recorded at capture time. Unique within a recording.
    pub frame_number: u64,
    /// Wall-clock time of the fix (Unix milliseconds).
    pub timestamp_ms: i64,
    /// Milliseconds since recording start. Primary ordering key.
    pub relative_time_ms: u64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    /// Bearing in degrees (0-360).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f32>,
    /// Ground speed in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl LocationSample {
    /// Create a sample with only the required fields set.
    pub fn new(frame_number: u64, relative_time_ms: u64, latitude: f64, longitude: f64) -> Self {
        Self {
            frame_number,
            timestamp_ms: 0,
            relative_time_ms,
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            bearing: None,
            speed: None,
        }
    }

    /// Absolute distance in milliseconds between this fix and `elapsed_ms`.
    #[allow(clippy::cast_precision_loss)]
    pub fn time_distance_ms(&self, elapsed_ms: f64) -> f64 {
        (self.relative_time_ms as f64 - elapsed_ms).abs()
    }

    /// Reject coordinates that cannot be placed on a map.
    pub fn validate(&self) -> Result<()> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(Error::InvalidCoordinate {
                frame_number: self.frame_number,
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_time_distance_is_symmetric() {
        let sample = LocationSample::new(150, 5000, 60.17, 24.94);
        assert_eq!(sample.time_distance_ms(4800.0), 200.0);
        assert_eq!(sample.time_distance_ms(5200.0), 200.0);
        assert_eq!(sample.time_distance_ms(5000.0), 0.0);
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(LocationSample::new(0, 0, 90.0, -180.0).validate().is_ok());
        assert!(LocationSample::new(0, 0, -90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_nan() {
        assert!(matches!(
            LocationSample::new(7, 0, 91.0, 0.0).validate(),
            Err(Error::InvalidCoordinate { frame_number: 7, .. })
        ));
        assert!(LocationSample::new(0, 0, 0.0, 181.0).validate().is_err());
        assert!(LocationSample::new(0, 0, f64::NAN, 0.0).validate().is_err());
    }
}
