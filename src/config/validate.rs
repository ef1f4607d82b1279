//! Configuration validation.

use crate::align::AlignmentPolicy;
use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_alignment(config)?;
    validate_clustering(config)?;
    validate_detection(config)?;
    Ok(())
}

/// Validate alignment defaults.
fn validate_alignment(config: &Config) -> Result<()> {
    let alignment = &config.alignment;

    AlignmentPolicy::new(
        alignment.default_fps,
        alignment.location_update_interval_ms,
        alignment.acceptance_multiplier,
    )
    .map(|_| ())
    .map_err(|e| Error::ConfigValidation {
        message: format!("[alignment] {e}"),
    })
}

/// Validate clustering thresholds for the selected metric.
fn validate_clustering(config: &Config) -> Result<()> {
    config
        .clustering
        .validate()
        .map_err(|e| Error::ConfigValidation {
            message: format!("[clustering] {e}"),
        })
}

/// Validate detection filters.
fn validate_detection(config: &Config) -> Result<()> {
    let min_confidence = config.detection.min_confidence;

    if !(confidence::MIN..=confidence::MAX).contains(&min_confidence) {
        return Err(Error::ConfigValidation {
            message: format!(
                "min_confidence must be between {} and {}, got {}",
                confidence::MIN,
                confidence::MAX,
                min_confidence
            ),
        });
    }

    Ok(())
}
