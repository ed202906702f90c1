//! Shift pairing.
//!
//! Entries are paired by position after sorting: (0, 1), (2, 3), and so on.
//! A log that does not alternate `in`/`out` is not an error; the
//! [`PairingMode`] decides what a malformed position produces.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::models::{Direction, PairingMode, ShiftPair, TimeEntry};

use super::time_zone::local_date;

/// Pairs one employee's entries into shifts.
///
/// `entries` must belong to a single employee. They are sorted here by
/// timestamp with the sequence id breaking ties, so callers may pass them in
/// any order.
///
/// # Example
///
/// ```
/// use bundy_engine::attendance::pair_entries;
/// use bundy_engine::models::{Direction, PairingMode, TimeEntry};
/// use chrono::{TimeZone, Utc};
///
/// let entry = |id, direction, hour| TimeEntry {
///     id,
///     employee_id: "emp_001".to_string(),
///     direction,
///     created_at: Utc.with_ymd_and_hms(2024, 1, 5, hour, 0, 0).unwrap(),
/// };
/// let entries = vec![
///     entry(1, Direction::In, 9),
///     entry(2, Direction::Out, 17),
///     entry(3, Direction::In, 20),
/// ];
///
/// let pairs = pair_entries(&entries, PairingMode::Strict);
/// assert_eq!(pairs.len(), 2);
/// assert!(!pairs[0].is_open());
/// assert!(pairs[1].is_open());
/// ```
pub fn pair_entries(entries: &[TimeEntry], mode: PairingMode) -> Vec<ShiftPair> {
    let mut sorted: Vec<&TimeEntry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.sort_key());

    sorted
        .chunks(2)
        .filter_map(|chunk| {
            let start = chunk[0];
            let next = chunk.get(1);
            match (mode, start.direction) {
                (PairingMode::Strict, Direction::In) => Some(ShiftPair {
                    start: start.created_at,
                    finish: next
                        .filter(|e| e.direction == Direction::Out)
                        .map(|e| e.created_at),
                }),
                (PairingMode::Strict, Direction::Out) => None,
                (PairingMode::Lenient, Direction::In) => Some(ShiftPair {
                    start: start.created_at,
                    finish: next.map(|e| e.created_at),
                }),
                (PairingMode::Lenient, Direction::Out) => Some(ShiftPair {
                    start: start.created_at,
                    finish: None,
                }),
            }
        })
        .collect()
}

/// Groups pairs by the local calendar date of their start.
///
/// Pairs keep their relative order within a date.
pub fn group_by_date(pairs: Vec<ShiftPair>, zone: Tz) -> BTreeMap<NaiveDate, Vec<ShiftPair>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ShiftPair>> = BTreeMap::new();
    for pair in pairs {
        by_date
            .entry(local_date(pair.start, zone))
            .or_default()
            .push(pair);
    }
    by_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use chrono_tz::Australia::Sydney;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    fn entry(id: u64, direction: Direction, created_at: DateTime<Utc>) -> TimeEntry {
        TimeEntry {
            id,
            employee_id: "emp_001".to_string(),
            direction,
            created_at,
        }
    }

    #[test]
    fn test_alternating_log_pairs_cleanly() {
        let entries = vec![
            entry(1, Direction::In, at(5, 9, 0)),
            entry(2, Direction::Out, at(5, 17, 0)),
            entry(3, Direction::In, at(6, 9, 15)),
        ];

        let pairs = pair_entries(&entries, PairingMode::Strict);
        assert_eq!(
            pairs,
            vec![
                ShiftPair {
                    start: at(5, 9, 0),
                    finish: Some(at(5, 17, 0)),
                },
                ShiftPair {
                    start: at(6, 9, 15),
                    finish: None,
                },
            ]
        );
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let entries = vec![
            entry(2, Direction::Out, at(5, 17, 0)),
            entry(1, Direction::In, at(5, 9, 0)),
        ];

        let pairs = pair_entries(&entries, PairingMode::Strict);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].start, at(5, 9, 0));
        assert_eq!(pairs[0].finish, Some(at(5, 17, 0)));
    }

    #[test]
    fn test_strict_drops_pairs_started_by_out() {
        // out, in, in, out: positions (0,1) start with out, (2,3) is clean.
        let entries = vec![
            entry(1, Direction::Out, at(5, 8, 0)),
            entry(2, Direction::In, at(5, 9, 0)),
            entry(3, Direction::In, at(5, 13, 0)),
            entry(4, Direction::Out, at(5, 17, 0)),
        ];

        let pairs = pair_entries(&entries, PairingMode::Strict);
        assert_eq!(
            pairs,
            vec![ShiftPair {
                start: at(5, 13, 0),
                finish: Some(at(5, 17, 0)),
            }]
        );
    }

    #[test]
    fn test_strict_in_in_leaves_finish_empty() {
        let entries = vec![
            entry(1, Direction::In, at(5, 9, 0)),
            entry(2, Direction::In, at(5, 10, 0)),
        ];

        let pairs = pair_entries(&entries, PairingMode::Strict);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].is_open());
    }

    #[test]
    fn test_lenient_keeps_every_position() {
        let entries = vec![
            entry(1, Direction::Out, at(5, 8, 0)),
            entry(2, Direction::In, at(5, 9, 0)),
            entry(3, Direction::In, at(5, 13, 0)),
            entry(4, Direction::In, at(5, 17, 0)),
        ];

        let pairs = pair_entries(&entries, PairingMode::Lenient);
        assert_eq!(
            pairs,
            vec![
                ShiftPair {
                    start: at(5, 8, 0),
                    finish: None,
                },
                ShiftPair {
                    start: at(5, 13, 0),
                    finish: Some(at(5, 17, 0)),
                },
            ]
        );
    }

    #[test]
    fn test_empty_log_has_no_pairs() {
        assert!(pair_entries(&[], PairingMode::Strict).is_empty());
        assert!(pair_entries(&[], PairingMode::Lenient).is_empty());
    }

    #[test]
    fn test_group_by_date_uses_zone() {
        // 22:00 UTC on the 4th is 09:00 on the 5th in Sydney.
        let pairs = vec![
            ShiftPair {
                start: at(4, 22, 0),
                finish: Some(at(5, 6, 0)),
            },
            ShiftPair {
                start: at(5, 23, 0),
                finish: None,
            },
        ];

        let utc = group_by_date(pairs.clone(), chrono_tz::UTC);
        assert_eq!(utc.len(), 2);

        let sydney = group_by_date(pairs, Sydney);
        let dates: Vec<NaiveDate> = sydney.keys().copied().collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            ]
        );
    }
}
