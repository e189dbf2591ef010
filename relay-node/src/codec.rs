/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wire codec for uplink / downlink command objects.
//!
//! Every frame is a MessagePack map keyed by strings:
//!
//! ```text
//! uplink   {"cmd": "start",  "my-time": 1700000100}
//! uplink   {"cmd": "status", "my-time": 1700000100, "state": [true, false]}
//! downlink {"cmd": "init",   "cur-time": 1700000100,
//!           "cmd-data": [{"st": true, "dow": 2, "tm": "0800"}, ...]}
//! ```
//!
//! [`Command`] is the typed form used inside the endpoint.  The private
//! `Wire*` structs mirror the map layout one-to-one; conversion between the
//! two is where required keys and schedule descriptors are validated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock;
use crate::relay::RelayState;
use crate::schedule::{EntryFault, ScheduleEntry};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default maximum application payload (US915 sub-band, lowest data rate).
/// The MAC's own advertised limit takes precedence.
pub const DEFAULT_MAX_PAYLOAD: usize = 51;

/// Application port all frames use.
pub const APP_PORT: u8 = 1;

const CMD_START: &str = "start";
const CMD_STATUS: &str = "status";
const CMD_INIT: &str = "init";

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a MessagePack command map.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// `cmd` is not one of `start`, `status`, `init`.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A recognised command lacks one of its required keys.
    #[error("'{cmd}' command is missing required key '{field}'")]
    MissingField {
        cmd: &'static str,
        field: &'static str,
    },

    /// A schedule descriptor in `cmd-data` is out of range.
    #[error("schedule descriptor #{index} is malformed: {fault}")]
    MalformedEntry { index: usize, fault: EntryFault },

    /// The encoded uplink does not fit in one frame.
    #[error("encoded frame is {len} bytes, maximum payload is {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

// ── Command ───────────────────────────────────────────────────────────────────

/// A decoded command object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Uplink: ask the control server for a schedule.
    Start { my_time: u64 },
    /// Uplink: periodic report of the relay levels.
    Status { my_time: u64, state: RelayState },
    /// Downlink: seed the clock and replace the schedule.
    Init {
        cur_time: u64,
        entries: Vec<ScheduleEntry>,
    },
}

impl Command {
    /// The wire value of `cmd`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => CMD_START,
            Command::Status { .. } => CMD_STATUS,
            Command::Init { .. } => CMD_INIT,
        }
    }
}

// ── Wire layout ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireCommand {
    cmd: String,
    #[serde(rename = "my-time", default, skip_serializing_if = "Option::is_none")]
    my_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<RelayState>,
    #[serde(rename = "cur-time", default, skip_serializing_if = "Option::is_none")]
    cur_time: Option<u64>,
    #[serde(rename = "cmd-data", default, skip_serializing_if = "Option::is_none")]
    cmd_data: Option<Vec<WireDescriptor>>,
}

/// `dow` is signed so that out-of-range values surface as
/// [`CodecError::MalformedEntry`] rather than a parse failure.
#[derive(Debug, Serialize, Deserialize)]
struct WireDescriptor {
    st: bool,
    dow: i64,
    tm: String,
}

impl From<&Command> for WireCommand {
    fn from(cmd: &Command) -> Self {
        let mut wire = WireCommand {
            cmd: cmd.name().to_string(),
            ..Default::default()
        };
        match cmd {
            Command::Start { my_time } => wire.my_time = Some(*my_time),
            Command::Status { my_time, state } => {
                wire.my_time = Some(*my_time);
                wire.state = Some(*state);
            }
            Command::Init { cur_time, entries } => {
                wire.cur_time = Some(*cur_time);
                wire.cmd_data = Some(
                    entries
                        .iter()
                        .map(|e| WireDescriptor {
                            st: e.desired,
                            dow: i64::from(e.dow),
                            tm: e.time_of_day(),
                        })
                        .collect(),
                );
            }
        }
        wire
    }
}

impl TryFrom<WireCommand> for Command {
    type Error = CodecError;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        match wire.cmd.as_str() {
            CMD_START => Ok(Command::Start {
                my_time: require(wire.my_time, CMD_START, "my-time")?,
            }),
            CMD_STATUS => Ok(Command::Status {
                my_time: require(wire.my_time, CMD_STATUS, "my-time")?,
                state: require(wire.state, CMD_STATUS, "state")?,
            }),
            CMD_INIT => {
                let cur_time = require(wire.cur_time, CMD_INIT, "cur-time")?;
                if clock::to_utc(cur_time).is_none() {
                    return Err(CodecError::MalformedFrame(format!(
                        "cur-time {cur_time} is outside the calendar range"
                    )));
                }
                let entries = require(wire.cmd_data, CMD_INIT, "cmd-data")?
                    .into_iter()
                    .enumerate()
                    .map(|(index, d)| {
                        ScheduleEntry::from_descriptor(d.dow, &d.tm, d.st)
                            .map_err(|fault| CodecError::MalformedEntry { index, fault })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Command::Init { cur_time, entries })
            }
            other => Err(CodecError::UnknownCommand(other.to_string())),
        }
    }
}

fn require<T>(value: Option<T>, cmd: &'static str, field: &'static str) -> Result<T, CodecError> {
    value.ok_or(CodecError::MissingField { cmd, field })
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Serialise `cmd` into one frame of at most `max_len` bytes.
pub fn encode(cmd: &Command, max_len: usize) -> Result<Vec<u8>, CodecError> {
    let bytes = rmp_serde::to_vec_named(&WireCommand::from(cmd))?;
    if bytes.len() > max_len {
        return Err(CodecError::FrameTooLarge {
            len: bytes.len(),
            max: max_len,
        });
    }
    Ok(bytes)
}

/// Parse one received frame.
pub fn decode(frame: &[u8]) -> Result<Command, CodecError> {
    let wire: WireCommand =
        rmp_serde::from_slice(frame).map_err(|e| CodecError::MalformedFrame(e.to_string()))?;
    Command::try_from(wire)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
