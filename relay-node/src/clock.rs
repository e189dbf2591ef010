/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wall-clock for the endpoint.
//!
//! The endpoint has no battery-backed RTC: at power-on the clock free-runs
//! from zero and is **invalid**.  It becomes **valid** the first time it is
//! seeded, either from the network-time answer or from an `init` downlink,
//! and never goes back to invalid during a session.
//!
//! ```text
//! TimeSource (monotonic uptime) ──► Clock ──► epoch seconds ──► DateTimeParts
//!                                     ▲
//!                        set_epoch() ─┘  (network time / init downlink)
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::info;

const SECS_PER_DAY: u64 = 86_400;

// ── Time sources ──────────────────────────────────────────────────────────────

/// Monotonic seconds-since-boot counter the clock is anchored to.
pub trait TimeSource {
    fn uptime_secs(&self) -> u64;
}

/// Host uptime backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemUptime {
    boot: Instant,
}

impl SystemUptime {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    /// The instant uptime zero corresponds to.
    pub fn boot_instant(&self) -> Instant {
        self.boot
    }
}

impl Default for SystemUptime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemUptime {
    fn uptime_secs(&self) -> u64 {
        self.boot.elapsed().as_secs()
    }
}

/// Manually advanced uptime for simulations and tests.
///
/// Cloning yields a handle onto the same counter, so a test can keep one
/// handle and move another into the endpoint.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<u64>>,
}

impl ManualTime {
    pub fn new(start: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn set(&self, secs: u64) {
        self.now.set(secs);
    }
}

impl TimeSource for ManualTime {
    fn uptime_secs(&self) -> u64 {
        self.now.get()
    }
}

// ── Calendar breakdown ────────────────────────────────────────────────────────

/// Calendar fields of a UTC instant.  `dow` is 0 = Sunday … 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeParts {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub dow: u8,
}

impl DateTimeParts {
    /// Break `epoch_secs` down into UTC calendar fields.
    ///
    /// Instants past the calendar range clamp to its last second.
    pub fn from_epoch(epoch_secs: u64) -> Self {
        let dt = to_utc(epoch_secs).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            year: dt.year(),
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            dow: dt.weekday().num_days_from_sunday() as u8,
        }
    }
}

/// The UTC instant `epoch_secs` names, if the calendar can represent it.
pub fn to_utc(epoch_secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(epoch_secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// `dd/mm/yy hh:mm:ss`, the format the endpoint prefixes radio events with.
impl fmt::Display for DateTimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:02} {:02}:{:02}:{:02}",
            self.day,
            self.month,
            self.year.rem_euclid(100),
            self.hour,
            self.minute,
            self.second
        )
    }
}

/// Day of week for an epoch instant, 0 = Sunday.
///
/// 1970-01-01 was a Thursday, hence the `+ 4`.
pub fn day_of_week(epoch_secs: u64) -> u8 {
    ((epoch_secs / SECS_PER_DAY + 4) % 7) as u8
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Wall-clock anchored to UNIX epoch seconds.
#[derive(Debug)]
pub struct Clock<T: TimeSource> {
    source: T,
    /// `(epoch_secs, uptime_secs)` captured by the last `set_epoch`.
    anchor: Option<(u64, u64)>,
}

impl<T: TimeSource> Clock<T> {
    /// A new clock in the `invalid` state.
    pub fn new(source: T) -> Self {
        Self {
            source,
            anchor: None,
        }
    }

    /// Seed the clock.  Moves `invalid → valid`; re-seeding a valid clock
    /// simply re-anchors it.
    pub fn set_epoch(&mut self, secs: u64) {
        let uptime = self.source.uptime_secs();
        if self.anchor.is_none() {
            info!(epoch = secs, "clock is now valid");
        }
        self.anchor = Some((secs, uptime));
    }

    /// Current epoch seconds.  While invalid this is the free-running
    /// seconds-since-boot value.
    pub fn get_epoch(&self) -> u64 {
        let uptime = self.source.uptime_secs();
        match self.anchor {
            Some((epoch, at)) => epoch.saturating_add(uptime.saturating_sub(at)),
            None => uptime,
        }
    }

    pub fn components(&self) -> DateTimeParts {
        DateTimeParts::from_epoch(self.get_epoch())
    }

    pub fn is_valid(&self) -> bool {
        self.anchor.is_some()
    }

    /// Monotonic seconds since boot, independent of the wall-clock anchor.
    pub fn uptime_secs(&self) -> u64 {
        self.source.uptime_secs()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
