//! Calendar helpers for the configured time zone.
//!
//! Every calendar decision in the engine (report dates, the sweep's date key,
//! "last action today") goes through these functions with an explicit zone.
//! The host process zone is never consulted.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Returns the calendar date of `instant` in `zone`.
pub fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// Formats a date as the `YYYY-MM-DD` key used by the sweep flag and file names.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a date as the `dd/mm/yyyy` report column label.
///
/// ```
/// use bundy_engine::attendance::date_label;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// assert_eq!(date_label(date), "05/01/2024");
/// ```
pub fn date_label(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Formats the local time of `instant` as zero-padded 24-hour `HHMM`.
///
/// ```
/// use bundy_engine::attendance::format_hhmm;
/// use chrono::{TimeZone, Utc};
///
/// // 22:15 UTC is 09:15 the next morning in Sydney (AEDT, +11:00).
/// let instant = Utc.with_ymd_and_hms(2024, 1, 4, 22, 15, 0).unwrap();
/// assert_eq!(format_hhmm(instant, chrono_tz::Australia::Sydney), "0915");
/// ```
pub fn format_hhmm(instant: DateTime<Utc>, zone: Tz) -> String {
    instant.with_timezone(&zone).format("%H%M").to_string()
}

/// Expands inclusive calendar bounds to instants: `start_date 00:00:00` to
/// `end_date 23:59:59` in `zone`.
///
/// A local time that falls in a DST gap resolves to the first valid instant
/// after it (start) or the last valid instant before it (end). Ambiguous
/// local times resolve outward so the range never shrinks.
pub fn day_bounds(
    start_date: NaiveDate,
    end_date: NaiveDate,
    zone: Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_date.and_time(NaiveTime::MIN);
    let end = end_date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
    (
        resolve_local(zone, start, false),
        resolve_local(zone, end, true),
    )
}

fn resolve_local(zone: Tz, local: NaiveDateTime, latest: bool) -> DateTime<Utc> {
    let step = if latest {
        -Duration::minutes(15)
    } else {
        Duration::minutes(15)
    };

    let mut candidate = local;
    // DST gaps are at most a couple of hours.
    for _ in 0..16 {
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, latest_dt) => {
                let dt = if latest { latest_dt } else { earliest };
                return dt.with_timezone(&Utc);
            }
            LocalResult::None => candidate += step,
        }
    }
    Utc.from_utc_datetime(&local)
}

/// Renders the "Last action" caption shown on a kiosk card.
///
/// Entries from today (in `zone`) show only the time; older ones include the
/// date. Times are 12-hour with a lowercase meridiem.
///
/// ```
/// use bundy_engine::attendance::last_action_label;
/// use chrono::{TimeZone, Utc};
///
/// let zone = chrono_tz::Australia::Sydney;
/// let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap(); // 14:00 local
/// let entry = Utc.with_ymd_and_hms(2024, 1, 4, 22, 5, 0).unwrap(); // 09:05 local
/// assert_eq!(last_action_label(entry, now, zone), "Last action: 9:05 am");
///
/// let older = Utc.with_ymd_and_hms(2024, 1, 2, 22, 5, 0).unwrap();
/// assert_eq!(last_action_label(older, now, zone), "Last action: 03/01/2024 9:05 am");
/// ```
pub fn last_action_label(last_entry_at: DateTime<Utc>, now: DateTime<Utc>, zone: Tz) -> String {
    let local = last_entry_at.with_timezone(&zone);
    let time = local.format("%-I:%M %P");
    if local.date_naive() == local_date(now, zone) {
        format!("Last action: {}", time)
    } else {
        format!("Last action: {} {}", date_label(local.date_naive()), time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Australia::Sydney;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_local_date_crosses_utc_midnight() {
        // 14:00 UTC on the 4th is 01:00 on the 5th in Sydney summer time.
        let instant = Utc.with_ymd_and_hms(2024, 1, 4, 14, 0, 0).unwrap();
        assert_eq!(local_date(instant, Sydney), date(2024, 1, 5));
        assert_eq!(local_date(instant, chrono_tz::UTC), date(2024, 1, 4));
    }

    #[test]
    fn test_date_key_and_label_formats() {
        let d = date(2024, 12, 5);
        assert_eq!(date_key(d), "2024-12-05");
        assert_eq!(date_label(d), "05/12/2024");
    }

    #[test]
    fn test_format_hhmm_is_zero_padded() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 0, 5, 0).unwrap();
        assert_eq!(format_hhmm(instant, chrono_tz::UTC), "0005");
    }

    #[test]
    fn test_day_bounds_cover_whole_local_days() {
        let (start, end) = day_bounds(date(2024, 1, 5), date(2024, 1, 6), Sydney);
        // Sydney is +11:00 in January.
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 4, 13, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 6, 12, 59, 59).unwrap());
    }

    #[test]
    fn test_day_bounds_in_utc() {
        let (start, end) = day_bounds(date(2024, 1, 5), date(2024, 1, 5), chrono_tz::UTC);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_day_bounds_skip_midnight_dst_gap() {
        // Santiago springs forward at local midnight: 2024-09-08 00:00 does not exist.
        let zone = chrono_tz::America::Santiago;
        let (start, _) = day_bounds(date(2024, 9, 8), date(2024, 9, 8), zone);
        let local = start.with_timezone(&zone);
        assert_eq!(local.date_naive(), date(2024, 9, 8));
        assert_eq!(local.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn test_last_action_label_pm() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap(); // 19:00 local
        let entry = Utc.with_ymd_and_hms(2024, 1, 5, 6, 30, 0).unwrap(); // 17:30 local
        assert_eq!(last_action_label(entry, now, Sydney), "Last action: 5:30 pm");
    }
}
