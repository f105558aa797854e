use chrono::{Duration, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads the calendar date from an ISO-8601 string.
///
/// Only the leading `YYYY-MM-DD` is significant; any time-of-day or offset that
/// follows is discarded so a value written as `2024-06-01T23:30:00-07:00` stays on
/// June 1st instead of drifting into the next day through a UTC conversion.
pub fn parse_date_only(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10)?;
    let rest = &value[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

pub mod date_only {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date_only(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {raw}")))
    }
}

pub mod date_only_opt {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => super::parse_date_only(&value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {value}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;
    use chrono_tz::Asia::Tokyo;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parse_date_only_accepts_plain_and_timestamped_values() {
        assert_eq!(parse_date_only("2024-06-01"), Some(d(2024, 6, 1)));
        assert_eq!(
            parse_date_only("2024-06-01T00:00:00.000Z"),
            Some(d(2024, 6, 1))
        );
        assert_eq!(parse_date_only(" 2024-06-01 "), Some(d(2024, 6, 1)));
        assert_eq!(parse_date_only("2024-06-01 08:30"), Some(d(2024, 6, 1)));
    }

    #[test]
    fn parse_date_only_rejects_garbage() {
        assert_eq!(parse_date_only(""), None);
        assert_eq!(parse_date_only("2024-6-1"), None);
        assert_eq!(parse_date_only("2024-13-01"), None);
        assert_eq!(parse_date_only("2024-06-01junk"), None);
        assert_eq!(parse_date_only("not a date"), None);
    }

    #[test]
    fn offsets_never_shift_the_written_day() {
        // Late evening west of UTC is already the next day in UTC.
        let late = Los_Angeles
            .with_ymd_and_hms(2024, 6, 1, 23, 30, 0)
            .single()
            .unwrap();
        assert_eq!(parse_date_only(&late.to_rfc3339()), Some(d(2024, 6, 1)));

        // Early morning east of UTC is still the previous day in UTC.
        let early = Tokyo.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).single().unwrap();
        assert_eq!(parse_date_only(&early.to_rfc3339()), Some(d(2024, 6, 1)));
    }

    #[test]
    fn day_arithmetic_crosses_month_and_leap_boundaries() {
        assert_eq!(add_days(d(2024, 2, 28), 1), d(2024, 2, 29));
        assert_eq!(add_days(d(2024, 6, 30), 2), d(2024, 7, 2));
        assert_eq!(days_between(d(2024, 6, 1), d(2024, 6, 3)), 2);
        assert_eq!(days_between(d(2024, 6, 3), d(2024, 6, 1)), -2);
    }
}
