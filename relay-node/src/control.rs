/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The endpoint control loop.
//!
//! [`Endpoint`] aggregates every piece of mutable endpoint state and is the
//! only thing that mutates schedule, clock and relays.  It is driven by one
//! cooperative queue of [`Job`]s: periodic ticks and MAC callbacks, each run
//! to completion.
//!
//! # Tick
//! ```text
//! 1. startup_complete == false          → slot := start{my-time}
//! 2. startup_complete && minute % 5 == 0 → slot := status{my-time, state}
//! 3. startup_complete                   → relay 0 := schedule.desired_state(now)
//! 4. !tx_in_progress && slot filled     → encode, send; drain on success,
//!                                         keep on TxBusy; a second status
//!                                         in the same minute is dropped
//! 5. next tick at now + tick_interval
//! ```
//!
//! # State machine
//! ```text
//! (invalid clock, not joined) ──JOINED──► (invalid clock, joined)
//! (invalid clock, joined) ──init downlink──► (valid clock, startup done)
//! (valid clock, startup done) ──tick──► (valid clock, startup done)
//! ```

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, DateTimeParts, TimeSource};
use crate::codec::{self, CodecError, Command};
use crate::protocol::{DomainEvent, ProtocolAdapter, SendError};
use crate::radio::{MacStack, StackCallback};
use crate::relay::{RelayController, RelayDriver, RelayState};
use crate::schedule::{ScheduleError, ScheduleStore};
use crate::uplink::UplinkSlot;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Seconds between two ticks.
pub const TICK_INTERVAL_SECS: u64 = 30;

/// Status uplinks go out in minutes divisible by this.
pub const STATUS_PERIOD_MINUTES: u8 = 5;

/// The relay port the schedule drives.
pub const SCHEDULED_PORT: usize = 0;

// ── Jobs and outcomes ─────────────────────────────────────────────────────────

/// One unit of work on the cooperative queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Tick,
    Stack(StackCallback),
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// The command this tick composed into the uplink slot.
    pub composed: Option<Command>,
    /// Level applied to the scheduled port, when the schedule was evaluated.
    pub applied: Option<bool>,
    /// A frame was handed to the MAC.
    pub transmitted: bool,
    /// Uptime seconds at which the next tick is due.
    pub next_tick_at: u64,
}

/// Why a downlink was dropped.
#[derive(Debug, Error)]
pub enum DownlinkError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Endpoint<M, T, D>
where
    M: MacStack,
    T: TimeSource,
    D: RelayDriver,
{
    clock: Clock<T>,
    schedule: ScheduleStore,
    relays: RelayController<D>,
    uplink: UplinkSlot,
    radio: ProtocolAdapter<M>,
    startup_complete: bool,
    /// Epoch minute (`epoch / 60`) of the last status handed to the MAC.
    last_status_minute: Option<u64>,
    tick_interval_secs: u64,
}

impl<M, T, D> Endpoint<M, T, D>
where
    M: MacStack,
    T: TimeSource,
    D: RelayDriver,
{
    /// A cold endpoint: clock invalid, schedule empty, relays OFF.
    pub fn new(mac: M, time: T, driver: D, tick_interval_secs: u64) -> Self {
        Self {
            clock: Clock::new(time),
            schedule: ScheduleStore::new(),
            relays: RelayController::new(driver),
            uplink: UplinkSlot::new(),
            radio: ProtocolAdapter::new(mac),
            startup_complete: false,
            last_status_minute: None,
            tick_interval_secs,
        }
    }

    /// Run one job to completion.  Returns the next tick deadline when the
    /// job was a tick.
    pub fn dispatch(&mut self, job: Job) -> Option<u64> {
        match job {
            Job::Tick => Some(self.tick().next_tick_at),
            Job::Stack(callback) => {
                self.handle_callback(callback);
                None
            }
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> TickOutcome {
        let epoch = self.clock.get_epoch();
        let now = self.clock.components();
        let mut composed = None;

        // 1. Startup uplink until an init arrives
        if !self.startup_complete {
            composed = Some(Command::Start { my_time: epoch });
        }

        // 2. Status uplink every five minutes
        if self.startup_complete && now.minute % STATUS_PERIOD_MINUTES == 0 {
            composed = Some(Command::Status {
                my_time: epoch,
                state: self.relays.state(),
            });
        }

        if let Some(cmd) = &composed {
            self.uplink.replace(cmd.clone());
        }

        // 3. Schedule evaluation
        let applied = if self.startup_complete {
            Some(self.evaluate_schedule(&now))
        } else {
            None
        };

        // 4. Transmit
        let transmitted = self.transmit();

        // 5. Reschedule
        let next_tick_at = self.clock.uptime_secs() + self.tick_interval_secs;

        debug!(
            at = %now,
            startup_complete = self.startup_complete,
            composed = ?composed.as_ref().map(Command::name),
            transmitted,
            "tick"
        );

        TickOutcome {
            composed,
            applied,
            transmitted,
            next_tick_at,
        }
    }

    fn evaluate_schedule(&mut self, now: &DateTimeParts) -> bool {
        let desired = self.schedule.desired_state(now);
        self.relays.apply(SCHEDULED_PORT, desired);
        desired
    }

    fn transmit(&mut self) -> bool {
        if self.radio.tx_in_progress() {
            return false;
        }
        let Some(cmd) = self.uplink.peek() else {
            return false;
        };

        let status_minute = match cmd {
            Command::Status { my_time, .. } => Some(my_time / 60),
            _ => None,
        };
        let encoded = codec::encode(cmd, self.radio.max_payload());

        // Both ticks of a status minute compose a status; only one goes out.
        if status_minute.is_some() && status_minute == self.last_status_minute {
            debug!("status already sent this minute, dropped");
            self.uplink.take();
            return false;
        }

        let frame = match encoded {
            Ok(frame) => frame,
            Err(e) => {
                error!("dropping uplink that cannot be encoded: {e}");
                self.uplink.take();
                return false;
            }
        };

        match self.radio.send(&frame) {
            Ok(()) => {
                self.uplink.take();
                if status_minute.is_some() {
                    self.last_status_minute = status_minute;
                }
                true
            }
            Err(SendError::TxBusy) => {
                debug!("radio busy, uplink kept for next tick");
                false
            }
            Err(e) => {
                error!("dropping uplink: {e}");
                self.uplink.take();
                false
            }
        }
    }

    // ── Callbacks ─────────────────────────────────────────────────────────────

    fn handle_callback(&mut self, callback: StackCallback) {
        let now = self.clock.components();
        match self.radio.handle(callback, &now) {
            Some(DomainEvent::TimeUpdated(reference)) => {
                let elapsed = self
                    .clock
                    .uptime_secs()
                    .saturating_sub(reference.local_uptime_secs);
                self.clock
                    .set_epoch(reference.epoch_secs.saturating_add(elapsed));
                info!(now = %self.clock.components(), "clock set from network time");
            }
            Some(DomainEvent::DownlinkReceived(frame)) => {
                if let Err(e) = self.apply_downlink(&frame) {
                    error!(len = frame.len(), "downlink dropped: {e}");
                }
            }
            None => {}
        }
    }

    /// Decode and apply one downlink frame.
    ///
    /// On any error schedule, clock and `startup_complete` are left exactly
    /// as they were.
    pub fn apply_downlink(&mut self, frame: &[u8]) -> Result<(), DownlinkError> {
        match codec::decode(frame)? {
            Command::Init { cur_time, entries } => {
                let count = entries.len();
                // Replace first: it is the only step that can still fail.
                self.schedule.replace(entries)?;
                self.clock.set_epoch(cur_time);
                if !self.startup_complete {
                    info!("startup complete");
                }
                self.startup_complete = true;
                info!(
                    cur_time,
                    entries = count,
                    now = %self.clock.components(),
                    "init applied"
                );

                let now = self.clock.components();
                self.evaluate_schedule(&now);
                Ok(())
            }
            other => {
                warn!(cmd = other.name(), "ignoring downlink command");
                Ok(())
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn clock(&self) -> &Clock<T> {
        &self.clock
    }

    pub fn schedule(&self) -> &ScheduleStore {
        &self.schedule
    }

    pub fn relay_state(&self) -> RelayState {
        self.relays.state()
    }

    pub fn relay_driver(&self) -> &D {
        self.relays.driver()
    }

    pub fn uplink(&self) -> &UplinkSlot {
        &self.uplink
    }

    pub fn is_startup_complete(&self) -> bool {
        self.startup_complete
    }

    pub fn tx_in_progress(&self) -> bool {
        self.radio.tx_in_progress()
    }

    pub fn is_joined(&self) -> bool {
        self.radio.is_joined()
    }

    pub fn tick_interval_secs(&self) -> u64 {
        self.tick_interval_secs
    }

    pub fn mac(&self) -> &M {
        self.radio.mac()
    }

    pub fn mac_mut(&mut self) -> &mut M {
        self.radio.mac_mut()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use crate::radio::sim::{SimConfig, SimMac};
    use crate::radio::Credentials;
    use crate::relay::SimPins;
    use crate::schedule::ScheduleEntry;

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Tuesday 2023-11-14 08:00:00 UTC.
    const TUE_0800: u64 = 1_699_948_800;

    fn endpoint(time: &ManualTime) -> Endpoint<SimMac, ManualTime, SimPins> {
        let mut mac = SimMac::new(SimConfig {
            reply_to_start: false,
            ..Default::default()
        });
        mac.init(&Credentials::new([0; 8], [1; 8], [2; 16]));
        Endpoint::new(mac, time.clone(), SimPins::new(), TICK_INTERVAL_SECS)
    }

    fn init(cur_time: u64, entries: Vec<ScheduleEntry>) -> Vec<u8> {
        codec::encode(&Command::Init { cur_time, entries }, usize::MAX).unwrap()
    }

    // ── dispatch / tick ───────────────────────────────────────────────────────

    #[test]
    fn tick_job_returns_next_deadline() {
        let time = ManualTime::new(100);
        let mut ep = endpoint(&time);
        assert_eq!(ep.dispatch(Job::Tick), Some(130));
    }

    #[test]
    fn cold_tick_composes_start_and_sends_it() {
        let time = ManualTime::new(7);
        let mut ep = endpoint(&time);
        let out = ep.tick();
        assert_eq!(out.composed, Some(Command::Start { my_time: 7 }));
        assert_eq!(out.applied, None, "no schedule evaluation before init");
        assert!(out.transmitted);
        assert!(ep.uplink().is_empty(), "slot drained after a successful send");
        assert!(ep.tx_in_progress());
    }

    #[test]
    fn status_only_on_five_minute_marks() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        ep.apply_downlink(&init(TUE_0800 + 60, vec![])).unwrap();

        let out = ep.tick();
        assert_eq!(out.composed, None, "08:01 is not a status minute");
        assert_eq!(out.applied, Some(false));

        time.advance(4 * 60);
        let out = ep.tick();
        assert_eq!(
            out.composed,
            Some(Command::Status {
                my_time: TUE_0800 + 300,
                state: [false, false]
            })
        );
    }

    #[test]
    fn one_status_per_minute_reaches_the_radio() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        ep.apply_downlink(&init(TUE_0800 + 300, vec![])).unwrap();

        let first = ep.tick();
        assert!(matches!(first.composed, Some(Command::Status { .. })));
        assert!(first.transmitted);

        // Join and airtime are over well before the next tick.
        time.set(30);
        while let Some(cb) = ep.mac_mut().poll(30) {
            ep.dispatch(Job::Stack(cb));
        }
        assert!(!ep.tx_in_progress());

        let second = ep.tick();
        assert_eq!(
            second.composed,
            Some(Command::Status {
                my_time: TUE_0800 + 330,
                state: [false, false]
            })
        );
        assert!(!second.transmitted);
        assert!(ep.uplink().is_empty());
        assert_eq!(ep.mac().tx_requests(), 1);
    }

    // ── downlinks ─────────────────────────────────────────────────────────────

    #[test]
    fn init_seeds_clock_installs_schedule_and_evaluates() {
        let time = ManualTime::new(50);
        let mut ep = endpoint(&time);
        let entries = vec![ScheduleEntry::new(2, 8, 0, true).unwrap()];
        ep.apply_downlink(&init(TUE_0800, entries.clone())).unwrap();

        assert!(ep.is_startup_complete());
        assert!(ep.clock().is_valid());
        assert_eq!(ep.clock().get_epoch(), TUE_0800);
        assert_eq!(ep.schedule().entries(), entries.as_slice());
        assert_eq!(ep.relay_state(), [true, false], "evaluated immediately");
    }

    #[test]
    fn uplink_command_on_downlink_path_is_ignored() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        let frame = codec::encode(&Command::Start { my_time: 1 }, 51).unwrap();
        assert!(ep.apply_downlink(&frame).is_ok());
        assert!(!ep.is_startup_complete());
        assert!(!ep.clock().is_valid());
    }

    #[test]
    fn init_with_unrepresentable_time_is_dropped() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        let err = ep.apply_downlink(&init(u64::MAX, vec![])).unwrap_err();
        assert!(matches!(
            err,
            DownlinkError::Codec(CodecError::MalformedFrame(_))
        ));
        assert!(!ep.clock().is_valid());
        assert!(!ep.is_startup_complete());

        time.advance(30);
        let out = ep.tick();
        assert_eq!(out.composed, Some(Command::Start { my_time: 30 }));
    }

    #[test]
    fn garbage_downlink_changes_nothing() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        let err = ep.apply_downlink(&[0xc1, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            DownlinkError::Codec(CodecError::MalformedFrame(_))
        ));
        assert!(!ep.is_startup_complete());
        assert!(!ep.clock().is_valid());
        assert!(ep.schedule().is_empty());
    }

    #[test]
    fn network_time_compensates_dispatch_latency() {
        let time = ManualTime::new(0);
        let mut ep = endpoint(&time);
        ep.tick();
        ep.mac_mut().request_network_time();

        // Join at 6, tx complete at 8; the callback is handled at 20.
        time.set(20);
        while let Some(cb) = ep.mac_mut().poll(20) {
            ep.dispatch(Job::Stack(cb));
        }
        assert!(ep.clock().is_valid());
        assert_eq!(ep.clock().get_epoch(), 1_700_000_000 + 20);
    }
}
