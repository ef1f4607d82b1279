//! Proximity test between two detections.

use crate::constants::cluster::{
    DEFAULT_LAT_THRESHOLD, DEFAULT_LNG_THRESHOLD, DEFAULT_RADIUS_METERS, EARTH_RADIUS_METERS,
    METERS_PER_DEGREE,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How "nearby" is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityMetric {
    /// Independent latitude and longitude thresholds in degrees.
    ///
    /// An equirectangular approximation: 0.0005° is roughly 50 m at
    /// mid-latitudes. Not valid near the poles or across the antimeridian.
    #[default]
    Box,
    /// Great-circle distance on a spherical Earth, against `radius_meters`.
    Haversine,
}

impl fmt::Display for ProximityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box => write!(f, "box"),
            Self::Haversine => write!(f, "haversine"),
        }
    }
}

impl FromStr for ProximityMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "box" | "degrees" => Ok(Self::Box),
            "haversine" | "meters" => Ok(Self::Haversine),
            other => Err(format!("unknown proximity metric: {other}")),
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Proximity metric.
    pub metric: ProximityMetric,
    /// Latitude threshold in degrees (`box` metric).
    pub lat_threshold: f64,
    /// Longitude threshold in degrees (`box` metric).
    pub lng_threshold: f64,
    /// Distance threshold in meters (`haversine` metric).
    pub radius_meters: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            metric: ProximityMetric::Box,
            lat_threshold: DEFAULT_LAT_THRESHOLD,
            lng_threshold: DEFAULT_LNG_THRESHOLD,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

impl ClusterSettings {
    /// Check that the thresholds in use are finite and positive.
    pub fn validate(&self) -> Result<()> {
        let checks: Vec<(&'static str, f64)> = match self.metric {
            ProximityMetric::Box => vec![
                ("lat_threshold", self.lat_threshold),
                ("lng_threshold", self.lng_threshold),
            ],
            ProximityMetric::Haversine => vec![("radius_meters", self.radius_meters)],
        };

        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidClusterThreshold { name, value });
            }
        }
        Ok(())
    }

    /// Whether two `(latitude, longitude)` points are nearby.
    pub fn is_nearby(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        match self.metric {
            ProximityMetric::Box => {
                (a.0 - b.0).abs() < self.lat_threshold && (a.1 - b.1).abs() < self.lng_threshold
            }
            ProximityMetric::Haversine => haversine_meters(a, b) <= self.radius_meters,
        }
    }

    /// Latitude difference in degrees beyond which no pair can be nearby.
    pub fn lat_cutoff(&self) -> f64 {
        match self.metric {
            ProximityMetric::Box => self.lat_threshold,
            ProximityMetric::Haversine => self.radius_meters / METERS_PER_DEGREE,
        }
    }

    /// Threshold expressed in meters, as reported on each cluster.
    pub fn nominal_radius_meters(&self) -> f64 {
        match self.metric {
            ProximityMetric::Box => self.lat_threshold * METERS_PER_DEGREE,
            ProximityMetric::Haversine => self.radius_meters,
        }
    }
}

/// Great-circle distance in meters between two `(latitude, longitude)` points.
pub fn haversine_meters(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lat2) = (a.0.to_radians(), b.0.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.1 - a.1).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_is_strict() {
        let settings = ClusterSettings::default();
        assert!(settings.is_nearby((60.0, 24.0), (60.0004, 24.0004)));
        assert!(!settings.is_nearby((60.0, 24.0), (60.0006, 24.0)));
        assert!(!settings.is_nearby((60.0, 24.0), (60.0, 24.0006)));
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude on the mean sphere.
        let d = haversine_meters((0.0, 0.0), (1.0, 0.0));
        assert!((d - METERS_PER_DEGREE).abs() < 1e-6);
        assert!(haversine_meters((51.5, -0.1), (51.5, -0.1)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_haversine_metric() {
        let settings = ClusterSettings {
            metric: ProximityMetric::Haversine,
            radius_meters: 50.0,
            ..ClusterSettings::default()
        };
        // ~44 m north.
        assert!(settings.is_nearby((60.0, 24.0), (60.0004, 24.0)));
        // ~67 m north.
        assert!(!settings.is_nearby((60.0, 24.0), (60.0006, 24.0)));
        assert!((settings.lat_cutoff() - 50.0 / METERS_PER_DEGREE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate() {
        assert!(ClusterSettings::default().validate().is_ok());

        let bad = ClusterSettings {
            lng_threshold: 0.0,
            ..ClusterSettings::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidClusterThreshold {
                name: "lng_threshold",
                ..
            })
        ));

        // Box thresholds are not consulted by the haversine metric.
        let haversine = ClusterSettings {
            metric: ProximityMetric::Haversine,
            ..bad
        };
        assert!(haversine.validate().is_ok());
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("Haversine".parse::<ProximityMetric>(), Ok(ProximityMetric::Haversine));
        assert_eq!("box".parse::<ProximityMetric>(), Ok(ProximityMetric::Box));
        assert!("manhattan".parse::<ProximityMetric>().is_err());
    }

    #[test]
    fn test_nominal_radius() {
        let settings = ClusterSettings::default();
        assert!((settings.nominal_radius_meters() - 55.6).abs() < 0.1);
    }
}
