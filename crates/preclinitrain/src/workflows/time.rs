//! Fixed-length calendar arithmetic and UTC normalisation.
//!
//! Validity periods and compliance windows are measured with average month and year
//! lengths rather than calendar arithmetic, so every derived date is a plain offset from
//! a UTC instant.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::error::EngineError;

/// Average month length used for validity periods.
pub const DAYS_PER_MONTH: f64 = 30.44;
/// Average year length used for rolling compliance windows.
pub const DAYS_PER_YEAR: f64 = 365.25;

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Converts a fractional day count into a duration with microsecond precision.
pub fn fractional_days(days: f64) -> Duration {
    Duration::microseconds((days * MICROS_PER_DAY).round() as i64)
}

pub fn average_months(months: u32) -> Duration {
    fractional_days(f64::from(months) * DAYS_PER_MONTH)
}

pub fn average_years(years: f64) -> Duration {
    fractional_days(years * DAYS_PER_YEAR)
}

/// Naive timestamps are stored as UTC wall-clock values.
pub fn assume_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    assume_utc(date.and_time(NaiveTime::MIN))
}

pub fn year_start(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(start_of_day)
}

/// Parses RFC 3339 (any offset), naive timestamps, or bare `YYYY-MM-DD` dates into UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, EngineError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(assume_utc(naive));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(start_of_day)
        .map_err(|_| EngineError::invalid(format!("'{raw}' is not a valid date or timestamp")))
}

pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_instant(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_average_months_span_365_28_days() {
        let expected = Duration::days(365) + Duration::seconds(24_192);
        assert_eq!(average_months(12), expected);
    }

    #[test]
    fn six_average_years_span_2191_and_a_half_days() {
        assert_eq!(
            average_years(6.0),
            Duration::days(2191) + Duration::hours(12)
        );
    }

    #[test]
    fn naive_and_offset_inputs_normalise_to_the_same_instant() {
        let naive = parse_instant("2024-03-01T10:00:00").expect("naive parses");
        let offset = parse_instant("2024-03-01T12:00:00+02:00").expect("offset parses");
        let zulu = parse_instant("2024-03-01T10:00:00Z").expect("zulu parses");
        assert_eq!(naive, offset);
        assert_eq!(naive, zulu);
    }

    #[test]
    fn bare_dates_parse_to_midnight_utc() {
        let parsed = parse_instant("2023-11-05").expect("date parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 11, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn malformed_dates_are_invalid_arguments() {
        match parse_instant("05/11/2023") {
            Err(EngineError::InvalidArgument(message)) => assert!(message.contains("05/11/2023")),
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }
}
