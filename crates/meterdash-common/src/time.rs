//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Timelike};

/// Format used for chart tick labels: 24-hour clock, no date, no zone.
pub const WALL_CLOCK_FORMAT: &str = "%H:%M:%S";

/// Current local wall-clock time truncated to whole seconds.
pub fn wall_clock_now() -> NaiveTime {
    wall_clock_of(&Local::now())
}

/// Local wall-clock time of `instant`, truncated to whole seconds.
///
/// The date is dropped on purpose, so two instants a day apart map to the same
/// value. Leap-second nanos are folded into the truncation.
pub fn wall_clock_of<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveTime {
    let time = instant.time();
    NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second()).unwrap_or(time)
}

/// Render a wall-clock time as `HH:MM:SS`.
pub fn wall_clock_label(time: NaiveTime) -> String {
    time.format(WALL_CLOCK_FORMAT).to_string()
}

/// Convert a duration into milliseconds, saturating at `u64::MAX`.
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn truncates_to_seconds() {
        let instant = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(13, 4, 59, 875)
            .unwrap()
            .and_utc();
        let time = wall_clock_of(&instant);
        assert_eq!(time.nanosecond(), 0);
        assert_eq!(wall_clock_label(time), "13:04:59");
    }

    #[test]
    fn label_is_zero_padded_24_hour() {
        let time = NaiveTime::from_hms_opt(7, 5, 3).unwrap();
        assert_eq!(wall_clock_label(time), "07:05:03");
        let evening = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(wall_clock_label(evening), "23:59:59");
    }

    #[test]
    fn midnight_rollover_is_not_disambiguated() {
        let day_one = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let day_two = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 1).unwrap();
        assert_eq!(wall_clock_of(&day_one), wall_clock_of(&day_two));
    }

    #[test]
    fn millis_saturate() {
        assert_eq!(duration_to_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
    }
}
