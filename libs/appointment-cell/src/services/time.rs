// libs/appointment-cell/src/services/time.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::{AppointmentError, TimeInput};

const COMBINED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p"];

/// Converts appointment time input into UTC instants, reading wall-clock values
/// in the configured business timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    timezone: Tz,
}

impl TimeNormalizer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn normalize(&self, input: &TimeInput) -> Result<DateTime<Utc>, AppointmentError> {
        let instant = match input {
            TimeInput::Combined { date_time } => self.normalize_combined(date_time),
            TimeInput::Split { date, time } => self.normalize_split(date, time),
        };

        match instant {
            Some(instant) => Ok(instant),
            None => {
                debug!("Rejected appointment time input {:?}", input);
                Err(AppointmentError::InvalidAppointmentDateTime)
            }
        }
    }

    fn normalize_combined(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();

        // An explicit offset pins the instant; everything else is business-local.
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Some(with_offset.with_timezone(&Utc));
        }

        COMBINED_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .and_then(|naive| self.localize(naive))
    }

    fn normalize_split(&self, date: &str, time: &str) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
        let time = TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(time.trim(), format).ok())?;

        self.localize(date.and_time(time))
    }

    /// Ambiguous wall-clock values resolve to the earlier instant; values that
    /// fall into a DST gap do not exist and are rejected.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// `YYYY-MM-DD HH:mm` in the business timezone.
    pub fn display_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M").to_string()
    }

    pub fn display_date(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.timezone).format("%Y-%m-%d").to_string()
    }

    pub fn display_clock(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.timezone).format("%H:%M").to_string()
    }

    /// ISO-8601 with the business timezone's offset, e.g. `2024-05-01T11:00:00+05:30`.
    pub fn render_with_offset(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string()
    }
}
