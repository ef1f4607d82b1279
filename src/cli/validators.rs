//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

/// Parse a finite value strictly greater than zero.
///
/// # Arguments
///
/// * `s` - The string to parse
/// * `name` - Name of the parameter for error messages
pub fn parse_positive_float(s: &str, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{name} must be a positive number, got {value}"));
    }

    Ok(value)
}

/// Parse and validate a frame rate.
pub fn parse_fps(s: &str) -> Result<f64, String> {
    parse_positive_float(s, "fps")
}

/// Parse and validate the match window multiplier.
pub fn parse_acceptance_multiplier(s: &str) -> Result<f64, String> {
    parse_positive_float(s, "acceptance multiplier")
}

/// Parse and validate a threshold in degrees.
pub fn parse_degrees(s: &str) -> Result<f64, String> {
    let value = parse_positive_float(s, "threshold")?;
    if value > 180.0 {
        return Err(format!("threshold must be at most 180 degrees, got {value}"));
    }
    Ok(value)
}

/// Parse and validate a distance in meters.
pub fn parse_meters(s: &str) -> Result<f64, String> {
    parse_positive_float(s, "radius")
}
