//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "geoalign";

/// Default nominal sampling period of the GPS stream in milliseconds.
pub const DEFAULT_LOCATION_INTERVAL_MS: u64 = 1000;

/// Default multiplier applied to the sampling period to get the match window.
///
/// With the default interval this accepts a fix up to two seconds away from
/// the detection's elapsed time.
pub const DEFAULT_ACCEPTANCE_MULTIPLIER: f64 = 2.0;

/// Frame rate assumed when neither the caller nor the metadata supplies one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Default number of recordings processed concurrently.
pub const DEFAULT_JOBS: usize = 4;

/// Clustering defaults.
pub mod cluster {
    /// Default latitude proximity threshold in degrees (~50 m).
    pub const DEFAULT_LAT_THRESHOLD: f64 = 0.0005;

    /// Default longitude proximity threshold in degrees (~50 m at mid-latitudes).
    pub const DEFAULT_LNG_THRESHOLD: f64 = 0.0005;

    /// Default great-circle radius for the haversine metric, in meters.
    pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

    /// Mean Earth radius for the spherical approximation, in meters.
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    /// Length of one degree of latitude on the mean sphere, in meters.
    pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for confidence formatting.
    pub const DECIMAL_PLACES: usize = 4;
}

/// Decimal places for coordinates in text outputs (~1 cm).
pub const COORDINATE_DECIMAL_PLACES: usize = 7;

/// Output file extensions by format.
pub mod output_extensions {
    /// JSON report extension.
    pub const JSON: &str = ".geoalign.json";
    /// Detections CSV extension.
    pub const CSV: &str = ".geoalign.csv";
    /// Cluster GeoJSON extension.
    pub const GEOJSON: &str = ".geoalign.geojson";
}

/// Input file naming.
pub mod inputs {
    /// Suffix of the detection file that accompanies `<stem>.json` metadata.
    pub const DETECTIONS_SUFFIX: &str = ".detections.csv";
    /// Extension of recording metadata files.
    pub const METADATA_EXTENSION: &str = "json";
}
