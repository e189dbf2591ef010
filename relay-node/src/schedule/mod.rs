//! Weekly relay schedule.
//!
//! [`ScheduleStore`] holds up to [`SCHEDULE_CAPACITY`] [`ScheduleEntry`]
//! transition events installed by the latest `init` downlink and answers
//! "what should relay 0 be doing right now?".
//!
//! # Matching rule
//!
//! An entry matches when its day-of-week and hour equal the current ones and
//! the current minute is at or past the entry's minute.  Entries are scanned
//! in stored order and the last match wins; no match means OFF.
//!
//! | now (Tue) | entries | desired |
//! |---|---|---|
//! | 08:00 | `ON Tue 08:00` | ON |
//! | 07:59 | `ON Tue 08:00` | OFF |
//! | 08:45 | `ON Tue 08:00`, `OFF Tue 08:30` | OFF |
//! | 09:00 | `ON Tue 08:00` | OFF (outside the matched hour) |
//!
//! The window deliberately ends at the hour boundary: entries are momentary
//! instructions polled every tick, not latched states.

pub mod error;

pub use error::{EntryFault, ScheduleError};

use tracing::{debug, info};

use crate::clock::DateTimeParts;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Maximum number of entries one `init` downlink may install.
pub const SCHEDULE_CAPACITY: usize = 25;

// ── ScheduleEntry ─────────────────────────────────────────────────────────────

/// One relay transition: at `dow hour:minute` (UTC) relay 0 should be `desired`.
///
/// `dow = 0` is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub dow: u8,
    pub hour: u8,
    pub minute: u8,
    pub desired: bool,
}

impl ScheduleEntry {
    /// Build an entry, rejecting out-of-range fields.
    pub fn new(dow: i64, hour: i64, minute: i64, desired: bool) -> Result<Self, EntryFault> {
        if !(0..=6).contains(&dow) {
            return Err(EntryFault::DayOfWeek(dow));
        }
        if !(0..=23).contains(&hour) {
            return Err(EntryFault::Hour(hour));
        }
        if !(0..=59).contains(&minute) {
            return Err(EntryFault::Minute(minute));
        }
        Ok(Self {
            dow: dow as u8,
            hour: hour as u8,
            minute: minute as u8,
            desired,
        })
    }

    /// Parse the wire time-of-day `HHMM` (exactly four ASCII digits).
    pub fn from_descriptor(dow: i64, tm: &str, desired: bool) -> Result<Self, EntryFault> {
        let bytes = tm.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(EntryFault::TimeFormat(tm.to_string()));
        }
        let two = |i: usize| i64::from(bytes[i] - b'0') * 10 + i64::from(bytes[i + 1] - b'0');
        Self::new(dow, two(0), two(2), desired)
    }

    /// The `HHMM` wire form of this entry's time of day.
    pub fn time_of_day(&self) -> String {
        format!("{:02}{:02}", self.hour, self.minute)
    }

    fn check(&self) -> Result<(), EntryFault> {
        Self::new(
            i64::from(self.dow),
            i64::from(self.hour),
            i64::from(self.minute),
            self.desired,
        )
        .map(|_| ())
    }

    fn matches(&self, now: &DateTimeParts) -> bool {
        self.dow == now.dow && self.hour == now.hour && now.minute >= self.minute
    }
}

// ── ScheduleStore ─────────────────────────────────────────────────────────────

/// The installed weekly schedule.  Empty at power-on.
#[derive(Debug, Default, Clone)]
pub struct ScheduleStore {
    entries: Vec<ScheduleEntry>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `entries` would be accepted by [`replace`](Self::replace)
    /// without touching the store.
    pub fn validate(entries: &[ScheduleEntry]) -> Result<(), ScheduleError> {
        if entries.len() > SCHEDULE_CAPACITY {
            return Err(ScheduleError::CapacityExceeded {
                len: entries.len(),
                capacity: SCHEDULE_CAPACITY,
            });
        }
        for (index, entry) in entries.iter().enumerate() {
            entry
                .check()
                .map_err(|fault| ScheduleError::MalformedEntry { index, fault })?;
        }
        Ok(())
    }

    /// Atomically install `entries`, preserving their order.
    ///
    /// # Errors
    /// [`ScheduleError::CapacityExceeded`] or [`ScheduleError::MalformedEntry`];
    /// in both cases the previous contents are kept.
    pub fn replace(&mut self, entries: Vec<ScheduleEntry>) -> Result<(), ScheduleError> {
        Self::validate(&entries)?;
        info!(
            previous = self.entries.len(),
            installed = entries.len(),
            "schedule replaced"
        );
        self.entries = entries;
        Ok(())
    }

    /// Desired state of relay 0 at `now`.
    pub fn desired_state(&self, now: &DateTimeParts) -> bool {
        let mut result = false;
        for entry in self.entries.iter().filter(|e| e.matches(now)) {
            result = entry.desired;
        }
        debug!(
            dow = now.dow,
            hour = now.hour,
            minute = now.minute,
            desired = result,
            "schedule evaluated"
        );
        result
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Test helpers ──────────────────────────────────────────────────────────

    fn entry(dow: u8, hour: u8, minute: u8, desired: bool) -> ScheduleEntry {
        ScheduleEntry {
            dow,
            hour,
            minute,
            desired,
        }
    }

    fn at(dow: u8, hour: u8, minute: u8) -> DateTimeParts {
        DateTimeParts {
            year: 2023,
            month: 11,
            day: 14,
            hour,
            minute,
            second: 0,
            dow,
        }
    }

    fn store_with(entries: Vec<ScheduleEntry>) -> ScheduleStore {
        let mut store = ScheduleStore::new();
        store.replace(entries).unwrap();
        store
    }

    // ── ScheduleEntry ─────────────────────────────────────────────────────────

    #[test]
    fn descriptor_time_is_split_into_hour_and_minute() {
        let e = ScheduleEntry::from_descriptor(2, "0830", true).unwrap();
        assert_eq!(e, entry(2, 8, 30, true));
        assert_eq!(e.time_of_day(), "0830");
    }

    #[test]
    fn descriptor_rejects_non_digit_or_wrong_length_time() {
        for tm in ["25XX", "800", "08:00", "08000", ""] {
            assert!(
                matches!(
                    ScheduleEntry::from_descriptor(1, tm, true),
                    Err(EntryFault::TimeFormat(_))
                ),
                "'{tm}' must be rejected"
            );
        }
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        assert_eq!(
            ScheduleEntry::new(7, 0, 0, true),
            Err(EntryFault::DayOfWeek(7))
        );
        assert_eq!(
            ScheduleEntry::new(-1, 0, 0, true),
            Err(EntryFault::DayOfWeek(-1))
        );
        assert_eq!(
            ScheduleEntry::from_descriptor(0, "2400", true),
            Err(EntryFault::Hour(24))
        );
        assert_eq!(
            ScheduleEntry::from_descriptor(0, "1260", true),
            Err(EntryFault::Minute(60))
        );
    }

    // ── replace ───────────────────────────────────────────────────────────────

    #[test]
    fn replace_preserves_order_and_length() {
        let entries = vec![
            entry(2, 17, 0, false),
            entry(2, 8, 0, true),
            entry(2, 8, 0, true),
        ];
        let store = store_with(entries.clone());
        assert_eq!(store.len(), 3);
        assert_eq!(store.entries(), entries.as_slice(), "no sorting, no dedup");
    }

    #[test]
    fn exactly_capacity_entries_are_accepted() {
        let entries = vec![entry(0, 0, 0, true); SCHEDULE_CAPACITY];
        let store = store_with(entries);
        assert_eq!(store.len(), SCHEDULE_CAPACITY);
    }

    #[test]
    fn over_capacity_is_rejected_and_store_is_kept() {
        let mut store = store_with(vec![entry(1, 1, 1, true); 3]);
        let err = store
            .replace(vec![entry(0, 0, 0, true); SCHEDULE_CAPACITY + 1])
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::CapacityExceeded {
                len: 26,
                capacity: 25
            }
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn malformed_entry_is_rejected_and_store_is_kept() {
        let mut store = store_with(vec![entry(1, 1, 1, true)]);
        let err = store
            .replace(vec![entry(1, 2, 0, true), entry(1, 24, 0, true)])
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::MalformedEntry {
                index: 1,
                fault: EntryFault::Hour(24)
            }
        ));
        assert_eq!(store.entries(), &[entry(1, 1, 1, true)]);
    }

    #[test]
    fn replace_with_empty_clears_the_schedule() {
        let mut store = store_with(vec![entry(1, 1, 1, true)]);
        store.replace(Vec::new()).unwrap();
        assert!(store.is_empty());
    }

    // ── desired_state ─────────────────────────────────────────────────────────

    #[test]
    fn empty_store_wants_off() {
        assert!(!ScheduleStore::new().desired_state(&at(2, 8, 0)));
    }

    #[test]
    fn minute_equal_to_entry_minute_matches() {
        let store = store_with(vec![entry(2, 8, 15, true)]);
        assert!(store.desired_state(&at(2, 8, 15)));
    }

    #[test]
    fn minute_before_entry_minute_does_not_match() {
        let store = store_with(vec![entry(2, 8, 15, true)]);
        assert!(!store.desired_state(&at(2, 8, 14)));
    }

    #[test]
    fn match_ends_at_the_hour_boundary() {
        let store = store_with(vec![entry(2, 8, 0, true)]);
        assert!(store.desired_state(&at(2, 8, 59)));
        assert!(!store.desired_state(&at(2, 9, 0)));
    }

    #[test]
    fn other_day_does_not_match() {
        let store = store_with(vec![entry(2, 8, 0, true)]);
        assert!(!store.desired_state(&at(3, 8, 0)));
    }

    #[test]
    fn later_entry_wins_on_identical_time() {
        let store = store_with(vec![entry(2, 8, 0, true), entry(2, 8, 0, false)]);
        assert!(!store.desired_state(&at(2, 8, 0)));

        let store = store_with(vec![entry(2, 8, 0, false), entry(2, 8, 0, true)]);
        assert!(store.desired_state(&at(2, 8, 0)));
    }

    #[test]
    fn later_transition_in_same_hour_overrides() {
        let store = store_with(vec![entry(2, 8, 0, true), entry(2, 8, 30, false)]);
        assert!(store.desired_state(&at(2, 8, 29)));
        assert!(!store.desired_state(&at(2, 8, 30)));
    }
}
