/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Contract with the LoRaWAN MAC / PHY stack.
//!
//! The endpoint treats the MAC as an opaque protocol engine.  [`MacStack`]
//! is everything it calls; [`StackCallback`] is everything the MAC calls
//! back with.  Callbacks must already be on the cooperative queue when they
//! reach the endpoint (never from interrupt context).
//!
//! [`sim::SimMac`] implements the contract on the host.

pub mod sim;

use std::fmt;

// ── Events ────────────────────────────────────────────────────────────────────

/// Event tags delivered by the MAC's event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacEvent {
    ScanTimeout,
    BeaconFound,
    BeaconMissed,
    BeaconTracked,
    Joining,
    Joined,
    JoinFailed,
    RejoinFailed,
    TxStart,
    /// Uplink finished, including its receive windows.  A downlink received
    /// in those windows is available through [`MacStack::rx_frame`].
    TxComplete,
    JoinTxComplete,
    /// Downlink received in a class-B ping slot.
    RxComplete,
    LostTsync,
    Reset,
    LinkDead,
    LinkAlive,
    Rfu1,
    Unknown(u32),
}

/// A callback queued by the MAC for the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCallback {
    Event(MacEvent),
    /// Answer to [`MacStack::request_network_time`].
    NetworkTime { success: bool },
}

// ── Transmit ──────────────────────────────────────────────────────────────────

/// Result of handing a frame to the MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxResult {
    Ok,
    /// A tx/rx window is still pending.
    Busy,
    /// Payload exceeds what the current data rate allows.
    LengthError,
    /// The MAC refused for a reason of its own (e.g. it is being reset).
    Rejected,
}

impl fmt::Display for TxResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxResult::Ok => "ok",
            TxResult::Busy => "busy",
            TxResult::LengthError => "length error",
            TxResult::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Flags of the last tx/rx cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxFlags {
    /// The network acknowledged a confirmed uplink.
    pub ack: bool,
}

/// Network time as answered by the network, tied to the local uptime at
/// which that answer was valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkTimeReference {
    pub epoch_secs: u64,
    pub local_uptime_secs: u64,
}

// ── Credentials ───────────────────────────────────────────────────────────────

/// OTAA credentials.  The EUIs are stored little-endian (least significant
/// byte first), the key as a raw block.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_eui: [u8; 8],
    dev_eui: [u8; 8],
    app_key: [u8; 16],
}

impl Credentials {
    pub fn new(app_eui: [u8; 8], dev_eui: [u8; 8], app_key: [u8; 16]) -> Self {
        Self {
            app_eui,
            dev_eui,
            app_key,
        }
    }

    pub fn app_eui(&self) -> [u8; 8] {
        self.app_eui
    }

    pub fn dev_eui(&self) -> [u8; 8] {
        self.dev_eui
    }

    pub fn app_key(&self) -> [u8; 16] {
        self.app_key
    }

    /// The device EUI as normally printed (most significant byte first).
    pub fn dev_eui_display(&self) -> String {
        self.dev_eui.iter().rev().map(|b| format!("{b:02X}")).collect()
    }
}

// The app key never reaches the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("dev_eui", &self.dev_eui_display())
            .field("app_key", &"<redacted>")
            .finish()
    }
}

// ── MacStack ──────────────────────────────────────────────────────────────────

/// The protocol engine the endpoint drives.
pub trait MacStack {
    /// Bring the stack up with the device's OTAA credentials.
    fn init(&mut self, credentials: &Credentials);

    /// Reset the MAC; the session and pending transfers are discarded.
    fn reset(&mut self);

    /// Restrict the US915 channel plan to one block of eight (zero-based).
    fn select_subband(&mut self, subband: u8);

    fn set_link_check_mode(&mut self, enabled: bool);

    /// Queue an uplink.  Joining happens implicitly on the first call.
    fn set_tx_data(&mut self, port: u8, payload: &[u8], confirmed: bool) -> TxResult;

    /// `true` while a tx/rx window is pending (no new uplink accepted).
    fn tx_rx_pending(&self) -> bool;

    /// Largest application payload the current data rate allows.
    fn max_payload(&self) -> usize;

    /// Ask the network for the time; answered with
    /// [`StackCallback::NetworkTime`].
    fn request_network_time(&mut self);

    fn network_time_reference(&self) -> Option<NetworkTimeReference>;

    fn rx_flags(&self) -> RxFlags;

    /// Payload of the last received downlink (empty when none).
    fn rx_frame(&self) -> &[u8];
}
