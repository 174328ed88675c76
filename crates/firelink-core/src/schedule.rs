// ── Scheduling helper ──
//
// Turns a time-of-day picked by the operator into the next matching
// instant, in the device's local ISO form (`YYYY-MM-DDTHH:MM:SS.mmm`,
// no offset).

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use crate::error::CoreError;

const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Next instant at `time_of_day`.
///
/// Today when `time_of_day` is strictly later than now's time-of-day
/// (sub-second part of `now` ignored), otherwise tomorrow.
pub fn next_occurrence(time_of_day: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let now_time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
    let today = now.date().and_time(time_of_day);
    if now_time < time_of_day {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Render with millisecond precision and no offset.
pub fn format_iso(datetime: NaiveDateTime) -> String {
    datetime.format(ISO_MILLIS).to_string()
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| CoreError::MalformedInput {
            message: format!("'{value}' is not a time of day (expected HH:MM or HH:MM:SS)"),
        })
}

/// Parse a device clock string, with or without fractional seconds.
pub fn parse_device_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// `date time` view of a device timestamp, without the fractional part.
///
/// Falls back to plain string surgery so odd clocks still display.
pub fn display_date_time(value: &str) -> String {
    parse_device_time(value).map_or_else(
        || value.replace('T', " ").split('.').next().unwrap_or_default().to_owned(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Schedule time string for `time_of_day`, relative to the device clock
/// when it is readable and the local wall clock otherwise.
pub fn schedule_time_for(time_of_day: NaiveTime, device_clock: Option<&str>) -> String {
    let now = device_clock
        .and_then(parse_device_time)
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    format_iso(next_occurrence(time_of_day, now))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(value: &str) -> NaiveDateTime {
        parse_device_time(value).unwrap()
    }

    fn time(value: &str) -> NaiveTime {
        parse_time_of_day(value).unwrap()
    }

    #[test]
    fn earlier_time_rolls_to_tomorrow() {
        let next = next_occurrence(time("09:00:00"), at("2024-05-01T10:00:00"));
        assert_eq!(format_iso(next), "2024-05-02T09:00:00.000");
    }

    #[test]
    fn later_time_stays_today() {
        let next = next_occurrence(time("11:00:00"), at("2024-05-01T10:00:00"));
        assert_eq!(format_iso(next), "2024-05-01T11:00:00.000");
    }

    #[test]
    fn equal_time_rolls_to_tomorrow() {
        let next = next_occurrence(time("10:00:00"), at("2024-05-01T10:00:00.750"));
        assert_eq!(format_iso(next), "2024-05-02T10:00:00.000");
    }

    #[test]
    fn rolls_over_month_end() {
        let next = next_occurrence(time("00:00"), at("2024-02-29T23:59:59"));
        assert_eq!(format_iso(next), "2024-03-01T00:00:00.000");
    }

    #[test]
    fn time_of_day_formats() {
        assert_eq!(time("21:30"), NaiveTime::from_hms_opt(21, 30, 0).unwrap());
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("nine").is_err());
    }

    #[test]
    fn device_time_with_and_without_fraction() {
        assert!(parse_device_time("2024-05-01T10:00:00").is_some());
        assert!(parse_device_time("2024-05-01T10:00:00.123456").is_some());
        assert!(parse_device_time("garbage").is_none());
    }

    #[test]
    fn date_time_display_drops_fraction() {
        assert_eq!(
            display_date_time("2024-05-01T21:00:00.000"),
            "2024-05-01 21:00:00"
        );
    }

    #[test]
    fn schedule_time_uses_device_clock() {
        assert_eq!(
            schedule_time_for(time("09:00"), Some("2024-05-01T10:00:00.000")),
            "2024-05-02T09:00:00.000"
        );
    }
}
