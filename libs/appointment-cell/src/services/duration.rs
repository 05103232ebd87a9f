// libs/appointment-cell/src/services/duration.rs
use chrono::Duration;
use regex::Regex;
use tracing::debug;

use crate::models::AppointmentError;

const DURATION_PATTERN: &str = r"^\s*(\d+(?:\.\d+)?)\s*([A-Za-z]+)\s*$";

const MINUTE_UNITS: &[&str] = &["min", "mins", "minute", "minutes"];
const HOUR_UNITS: &[&str] = &["h", "hour", "hours"];

/// Parses service durations such as `30 mins` or `1.5 hours`.
#[derive(Debug, Clone)]
pub struct DurationResolver {
    pattern: Regex,
}

impl DurationResolver {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(DURATION_PATTERN).expect("duration pattern is a valid regex"),
        }
    }

    /// Minutes represented by `raw`; hour values are multiplied by 60.
    pub fn parse_minutes(&self, raw: &str) -> Result<f64, AppointmentError> {
        let captures = self
            .pattern
            .captures(raw)
            .ok_or_else(|| AppointmentError::InvalidDurationFormat(raw.to_string()))?;

        let value: f64 = captures[1]
            .parse()
            .map_err(|_| AppointmentError::InvalidDurationFormat(raw.to_string()))?;
        let unit = captures[2].to_ascii_lowercase();

        let minutes = if MINUTE_UNITS.contains(&unit.as_str()) {
            value
        } else if HOUR_UNITS.contains(&unit.as_str()) {
            value * 60.0
        } else {
            return Err(AppointmentError::UnsupportedDurationUnit(unit));
        };

        debug!("Resolved duration '{}' to {} minutes", raw, minutes);
        Ok(minutes)
    }

    /// Same as [`parse_minutes`](Self::parse_minutes) but as a chrono duration,
    /// rounded to the millisecond.
    pub fn parse(&self, raw: &str) -> Result<Duration, AppointmentError> {
        let minutes = self.parse_minutes(raw)?;
        Ok(Duration::milliseconds((minutes * 60_000.0).round() as i64))
    }
}

impl Default for DurationResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_service_durations() {
        let resolver = DurationResolver::new();
        assert_eq!(resolver.parse_minutes("1.5 hours").unwrap(), 90.0);
        assert_eq!(resolver.parse_minutes("45 mins").unwrap(), 45.0);
        assert_eq!(resolver.parse_minutes("2 hour").unwrap(), 120.0);
    }

    #[test]
    fn rejects_bad_shapes_and_units() {
        let resolver = DurationResolver::new();
        assert!(matches!(
            resolver.parse_minutes("soon"),
            Err(AppointmentError::InvalidDurationFormat(_))
        ));
        assert!(matches!(
            resolver.parse_minutes("5 days"),
            Err(AppointmentError::UnsupportedDurationUnit(ref unit)) if unit == "days"
        ));
        assert!(matches!(
            resolver.parse_minutes("2 hr"),
            Err(AppointmentError::UnsupportedDurationUnit(_))
        ));
    }

    #[test]
    fn parses_without_whitespace() {
        let resolver = DurationResolver::new();
        assert_eq!(resolver.parse_minutes("45mins").unwrap(), 45.0);
        assert_eq!(resolver.parse_minutes("2h").unwrap(), 120.0);
    }

    #[test]
    fn unit_is_case_insensitive() {
        let resolver = DurationResolver::new();
        assert_eq!(resolver.parse_minutes("1 HOUR").unwrap(), 60.0);
        assert_eq!(resolver.parse_minutes("15 Minutes").unwrap(), 15.0);
    }

    #[test]
    fn fractional_minutes_become_milliseconds() {
        let resolver = DurationResolver::new();
        assert_eq!(resolver.parse("0.5 min").unwrap(), Duration::seconds(30));
    }
}
