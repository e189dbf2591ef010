/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Host-side simulation of the MAC and of the network / control server.
//!
//! [`SimMac`] runs the OTAA join, airtime and receive windows against a
//! caller-supplied uptime, and plays a control server that answers `start`
//! uplinks with an `init` downlink.  Callbacks are pulled with
//! [`SimMac::poll`] and dispatched by the caller, which keeps everything on
//! one cooperative queue.
//!
//! ```text
//! set_tx_data ─► [not joined] JOINING ── join_delay ──► JOIN_TXCOMPLETE, JOINED, TXSTART
//!             └► [joined]     TXSTART
//!                                  └── airtime ──► TXCOMPLETE (+ rx frame)
//!                                                  [+ NetworkTime if requested]
//! ```

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::codec::{self, Command};
use crate::radio::{
    Credentials, MacEvent, MacStack, NetworkTimeReference, RxFlags, StackCallback, TxResult,
};
use crate::schedule::ScheduleEntry;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seconds from the first uplink request to JOINED.
    pub join_delay_secs: u64,
    /// Seconds from TXSTART to TXCOMPLETE (airtime plus receive windows).
    pub airtime_secs: u64,
    pub max_payload: usize,
    /// Network epoch seconds at uptime zero.
    pub start_epoch: u64,
    /// Answer `start` uplinks with an `init` carrying [`Self::schedule`].
    pub reply_to_start: bool,
    pub schedule: Vec<ScheduleEntry>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            join_delay_secs: 6,
            airtime_secs: 2,
            max_payload: codec::DEFAULT_MAX_PAYLOAD,
            start_epoch: 1_700_000_000,
            reply_to_start: true,
            schedule: Vec::new(),
        }
    }
}

// ── Internal state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Stage {
    Joining { until: u64 },
    Transmitting { until: u64 },
}

/// A callback waiting to be polled, with the receive buffer it delivers.
#[derive(Debug)]
struct Queued {
    callback: StackCallback,
    rx: Option<Vec<u8>>,
}

#[derive(Debug)]
struct PendingTx {
    frame: Vec<u8>,
    stage: Stage,
}

// ── SimMac ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SimMac {
    config: SimConfig,
    now: u64,
    dev_eui: Option<String>,
    subband: Option<u8>,
    link_check: bool,
    joined: bool,
    pending: Option<PendingTx>,
    ready: VecDeque<Queued>,
    rx_frame: Vec<u8>,
    rx_flags: RxFlags,
    acked: bool,
    time_requested: bool,
    time_ref: Option<NetworkTimeReference>,
    downlinks: VecDeque<Vec<u8>>,
    uplinks: Vec<Vec<u8>>,
    tx_requests: usize,
}

impl SimMac {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            now: 0,
            dev_eui: None,
            subband: None,
            link_check: true,
            joined: false,
            pending: None,
            ready: VecDeque::new(),
            rx_frame: Vec::new(),
            rx_flags: RxFlags::default(),
            acked: false,
            time_requested: false,
            time_ref: None,
            downlinks: VecDeque::new(),
            uplinks: Vec::new(),
            tx_requests: 0,
        }
    }

    /// Advance the simulation to `now` (uptime seconds) and hand out the next
    /// queued callback, if any.
    pub fn poll(&mut self, now: u64) -> Option<StackCallback> {
        self.now = self.now.max(now);
        self.advance();
        let queued = self.ready.pop_front()?;
        // The rx buffer belongs to the callback being handed out.
        if let Some(frame) = queued.rx {
            self.rx_frame = frame;
        }
        Some(queued.callback)
    }

    fn emit(&mut self, event: MacEvent) {
        self.ready.push_back(Queued {
            callback: StackCallback::Event(event),
            rx: None,
        });
    }

    fn emit_rx(&mut self, event: MacEvent, frame: Vec<u8>) {
        self.ready.push_back(Queued {
            callback: StackCallback::Event(event),
            rx: Some(frame),
        });
    }

    fn advance(&mut self) {
        while let Some(pending) = &mut self.pending {
            match pending.stage {
                Stage::Joining { until } if self.now >= until => {
                    pending.stage = Stage::Transmitting {
                        until: until + self.config.airtime_secs,
                    };
                    self.joined = true;
                    info!(dev_eui = ?self.dev_eui, "sim: join accepted");
                    self.emit(MacEvent::JoinTxComplete);
                    self.emit(MacEvent::Joined);
                    self.emit(MacEvent::TxStart);
                }
                Stage::Transmitting { until } if self.now >= until => {
                    self.complete_tx(until);
                }
                _ => break,
            }
        }
    }

    fn complete_tx(&mut self, at: u64) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.serve_uplink(&pending.frame, at);
        self.uplinks.push(pending.frame);

        let rx = self.downlinks.pop_front().unwrap_or_default();
        self.rx_flags = RxFlags { ack: self.acked };
        self.emit_rx(MacEvent::TxComplete, rx);

        if self.time_requested {
            self.time_requested = false;
            self.time_ref = Some(NetworkTimeReference {
                epoch_secs: self.network_epoch(at),
                local_uptime_secs: at,
            });
            self.ready.push_back(Queued {
                callback: StackCallback::NetworkTime { success: true },
                rx: None,
            });
        }
    }

    /// The control server's side of an uplink.
    fn serve_uplink(&mut self, frame: &[u8], at: u64) {
        match codec::decode(frame) {
            Ok(Command::Start { my_time }) if self.config.reply_to_start => {
                if !self.downlinks.is_empty() {
                    return;
                }
                let init = Command::Init {
                    cur_time: self.network_epoch(at),
                    entries: self.config.schedule.clone(),
                };
                match codec::encode(&init, usize::MAX) {
                    Ok(bytes) => {
                        debug!(my_time, len = bytes.len(), "sim server: answering start with init");
                        self.downlinks.push_back(bytes);
                    }
                    Err(e) => warn!("sim server: cannot encode init: {e}"),
                }
            }
            Ok(cmd) => debug!(cmd = ?cmd, "sim server: uplink received"),
            Err(e) => warn!("sim server: undecodable uplink: {e}"),
        }
    }

    fn network_epoch(&self, uptime: u64) -> u64 {
        self.config.start_epoch.saturating_add(uptime)
    }

    // ── Test / operator hooks ─────────────────────────────────────────────────

    /// Queue a downlink for the next receive window.
    pub fn queue_downlink(&mut self, frame: Vec<u8>) {
        self.downlinks.push_back(frame);
    }

    /// Deliver `frame` in a class-B ping slot right away.
    pub fn deliver_ping_slot(&mut self, frame: Vec<u8>) {
        self.emit_rx(MacEvent::RxComplete, frame);
    }

    pub fn set_acked(&mut self, acked: bool) {
        self.acked = acked;
    }

    /// Every uplink frame that completed transmission, oldest first.
    pub fn uplinks(&self) -> &[Vec<u8>] {
        &self.uplinks
    }

    /// Completed uplinks, decoded.  Undecodable frames are skipped.
    pub fn decoded_uplinks(&self) -> Vec<Command> {
        self.uplinks
            .iter()
            .filter_map(|f| codec::decode(f).ok())
            .collect()
    }

    /// Number of `set_tx_data` calls, accepted or not.
    pub fn tx_requests(&self) -> usize {
        self.tx_requests
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn link_check_enabled(&self) -> bool {
        self.link_check
    }

    pub fn selected_subband(&self) -> Option<u8> {
        self.subband
    }

    pub fn dev_eui(&self) -> Option<&str> {
        self.dev_eui.as_deref()
    }
}

impl MacStack for SimMac {
    fn init(&mut self, credentials: &Credentials) {
        self.dev_eui = Some(credentials.dev_eui_display());
    }

    fn reset(&mut self) {
        self.joined = false;
        self.pending = None;
        self.ready.clear();
        self.rx_frame.clear();
        self.time_requested = false;
        self.link_check = true;
    }

    fn select_subband(&mut self, subband: u8) {
        self.subband = Some(subband);
    }

    fn set_link_check_mode(&mut self, enabled: bool) {
        self.link_check = enabled;
    }

    fn set_tx_data(&mut self, _port: u8, payload: &[u8], _confirmed: bool) -> TxResult {
        self.tx_requests += 1;
        if self.dev_eui.is_none() {
            return TxResult::Rejected;
        }
        if self.pending.is_some() {
            return TxResult::Busy;
        }
        if payload.len() > self.config.max_payload {
            return TxResult::LengthError;
        }

        let stage = if self.joined {
            self.emit(MacEvent::TxStart);
            Stage::Transmitting {
                until: self.now + self.config.airtime_secs,
            }
        } else {
            self.emit(MacEvent::Joining);
            Stage::Joining {
                until: self.now + self.config.join_delay_secs,
            }
        };
        self.pending = Some(PendingTx {
            frame: payload.to_vec(),
            stage,
        });
        TxResult::Ok
    }

    fn tx_rx_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn max_payload(&self) -> usize {
        self.config.max_payload
    }

    fn request_network_time(&mut self) {
        self.time_requested = true;
    }

    fn network_time_reference(&self) -> Option<NetworkTimeReference> {
        self.time_ref
    }

    fn rx_flags(&self) -> RxFlags {
        self.rx_flags
    }

    fn rx_frame(&self) -> &[u8] {
        &self.rx_frame
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
