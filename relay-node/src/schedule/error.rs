/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the weekly schedule store.
//!
//! Both variants are produced by
//! [`ScheduleStore::replace()`](super::ScheduleStore::replace) and leave the
//! store untouched.  The downlink path logs them and drops the offending
//! `init` frame.

use thiserror::Error;

// ── Entry validation ──────────────────────────────────────────────────────────

/// Which field of a schedule entry is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryFault {
    /// `dow` outside `0..=6`.
    DayOfWeek(i64),
    /// `hour` outside `0..=23`.
    Hour(i64),
    /// `minute` outside `0..=59`.
    Minute(i64),
    /// The `tm` string is not exactly four ASCII digits (`HHMM`).
    TimeFormat(String),
}

impl std::fmt::Display for EntryFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryFault::DayOfWeek(v) => write!(f, "day of week {} is outside 0..=6", v),
            EntryFault::Hour(v) => write!(f, "hour {} is outside 0..=23", v),
            EntryFault::Minute(v) => write!(f, "minute {} is outside 0..=59", v),
            EntryFault::TimeFormat(tm) => {
                write!(f, "time '{}' is not four ASCII digits (HHMM)", tm)
            }
        }
    }
}

impl std::error::Error for EntryFault {}

// ── Store errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// More entries than the store can hold.
    #[error("schedule has {len} entries, capacity is {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    /// An entry has a field out of range.
    #[error("schedule entry #{index} is malformed: {fault}")]
    MalformedEntry { index: usize, fault: EntryFault },
}
