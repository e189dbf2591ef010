/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Adapter between the MAC's callbacks and the endpoint's domain.
//!
//! [`ProtocolAdapter`] owns the [`MacStack`] and turns its raw callbacks into
//! two domain effects, [`DomainEvent::TimeUpdated`] and
//! [`DomainEvent::DownlinkReceived`].  It mutates nothing but its own flags;
//! the control loop decides what the effects do to clock and schedule.
//!
//! ```text
//!  JOINED ──► link check off, request network time
//!  NetworkTime{ok} ──► TimeUpdated
//!  TXCOMPLETE ──► tx_in_progress = false ──► DownlinkReceived (if rx data)
//!  RXCOMPLETE ──► DownlinkReceived
//! ```

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::DateTimeParts;
use crate::codec::APP_PORT;
use crate::radio::{MacEvent, MacStack, NetworkTimeReference, StackCallback, TxResult};

// ── Domain effects ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// The network answered the time request.
    TimeUpdated(NetworkTimeReference),
    /// A downlink payload arrived (rx window or ping slot).
    DownlinkReceived(Vec<u8>),
}

// ── Send errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// A tx/rx window is pending or duty cycle defers the uplink; retry on the
    /// next tick.
    #[error("radio busy: tx/rx window pending")]
    TxBusy,

    #[error("frame of {len} bytes exceeds the MAC payload limit of {max}")]
    FrameTooLong { len: usize, max: usize },

    #[error("MAC refused the uplink: {0}")]
    Rejected(TxResult),
}

// ── ProtocolAdapter ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ProtocolAdapter<M: MacStack> {
    mac: M,
    tx_in_progress: bool,
    joined: bool,
    join_failures: u32,
}

impl<M: MacStack> ProtocolAdapter<M> {
    pub fn new(mac: M) -> Self {
        Self {
            mac,
            tx_in_progress: false,
            joined: false,
            join_failures: 0,
        }
    }

    /// Submit `frame` on the application port, unconfirmed.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), SendError> {
        if self.tx_in_progress || self.mac.tx_rx_pending() {
            debug!("tx/rx pending, not sending");
            return Err(SendError::TxBusy);
        }

        match self.mac.set_tx_data(APP_PORT, frame, false) {
            TxResult::Ok => {
                self.tx_in_progress = true;
                info!(len = frame.len(), "packet queued");
                Ok(())
            }
            TxResult::Busy => Err(SendError::TxBusy),
            TxResult::LengthError => Err(SendError::FrameTooLong {
                len: frame.len(),
                max: self.mac.max_payload(),
            }),
            other => Err(SendError::Rejected(other)),
        }
    }

    /// Translate one MAC callback.  `now` only stamps the log record.
    pub fn handle(&mut self, callback: StackCallback, now: &DateTimeParts) -> Option<DomainEvent> {
        match callback {
            StackCallback::Event(event) => self.handle_event(event, now),
            StackCallback::NetworkTime { success } => self.handle_network_time(success, now),
        }
    }

    fn handle_event(&mut self, event: MacEvent, now: &DateTimeParts) -> Option<DomainEvent> {
        info!(at = %now, event = ?event, "radio event");

        match event {
            MacEvent::Joined => {
                self.joined = true;
                self.join_failures = 0;
                // Link check is enabled during join but not supported by the
                // network server.
                self.mac.set_link_check_mode(false);
                self.mac.request_network_time();
                None
            }
            MacEvent::JoinFailed | MacEvent::RejoinFailed => {
                self.join_failures += 1;
                warn!(
                    failures = self.join_failures,
                    "join attempt failed, MAC keeps retrying"
                );
                None
            }
            MacEvent::TxComplete => {
                self.tx_in_progress = false;
                if self.mac.rx_flags().ack {
                    info!("received ack");
                }
                self.take_downlink()
            }
            MacEvent::RxComplete => self.take_downlink(),
            MacEvent::Reset => {
                // A MAC reset discards pending transfers; no TXCOMPLETE follows.
                self.tx_in_progress = false;
                self.joined = false;
                None
            }
            MacEvent::LinkDead => {
                warn!("link dead: no downlink seen for a long time");
                None
            }
            MacEvent::Unknown(code) => {
                error!(code, "unknown radio event");
                None
            }
            _ => None,
        }
    }

    fn handle_network_time(&mut self, success: bool, now: &DateTimeParts) -> Option<DomainEvent> {
        match (success, self.mac.network_time_reference()) {
            (true, Some(reference)) => {
                info!(
                    at = %now,
                    network_time = reference.epoch_secs,
                    "network time received"
                );
                Some(DomainEvent::TimeUpdated(reference))
            }
            _ => {
                warn!(success, "network time request failed, clock unchanged");
                None
            }
        }
    }

    fn take_downlink(&self) -> Option<DomainEvent> {
        let frame = self.mac.rx_frame();
        if frame.is_empty() {
            return None;
        }
        info!(len = frame.len(), "received downlink payload");
        Some(DomainEvent::DownlinkReceived(frame.to_vec()))
    }

    pub fn tx_in_progress(&self) -> bool {
        self.tx_in_progress
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn join_failures(&self) -> u32 {
        self.join_failures
    }

    pub fn max_payload(&self) -> usize {
        self.mac.max_payload()
    }

    pub fn mac(&self) -> &M {
        &self.mac
    }

    pub fn mac_mut(&mut self) -> &mut M {
        &mut self.mac
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{Credentials, RxFlags};

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Records every call; answers are set up by the test.
    #[derive(Default)]
    struct FakeMac {
        pending: bool,
        answer: Option<TxResult>,
        submitted: Vec<(u8, Vec<u8>, bool)>,
        link_check: Option<bool>,
        time_requests: usize,
        time_ref: Option<NetworkTimeReference>,
        rx: Vec<u8>,
        ack: bool,
    }

    impl MacStack for FakeMac {
        fn init(&mut self, _credentials: &Credentials) {}
        fn reset(&mut self) {}
        fn select_subband(&mut self, _subband: u8) {}
        fn set_link_check_mode(&mut self, enabled: bool) {
            self.link_check = Some(enabled);
        }
        fn set_tx_data(&mut self, port: u8, payload: &[u8], confirmed: bool) -> TxResult {
            self.submitted.push((port, payload.to_vec(), confirmed));
            self.answer.unwrap_or(TxResult::Ok)
        }
        fn tx_rx_pending(&self) -> bool {
            self.pending
        }
        fn max_payload(&self) -> usize {
            51
        }
        fn request_network_time(&mut self) {
            self.time_requests += 1;
        }
        fn network_time_reference(&self) -> Option<NetworkTimeReference> {
            self.time_ref
        }
        fn rx_flags(&self) -> RxFlags {
            RxFlags { ack: self.ack }
        }
        fn rx_frame(&self) -> &[u8] {
            &self.rx
        }
    }

    fn now() -> DateTimeParts {
        DateTimeParts::from_epoch(0)
    }

    fn event(adapter: &mut ProtocolAdapter<FakeMac>, ev: MacEvent) -> Option<DomainEvent> {
        adapter.handle(StackCallback::Event(ev), &now())
    }

    // ── send ──────────────────────────────────────────────────────────────────

    #[test]
    fn send_submits_on_port_one_unconfirmed() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        adapter.send(&[1, 2, 3]).unwrap();
        assert!(adapter.tx_in_progress());
        assert_eq!(adapter.mac().submitted, vec![(1, vec![1, 2, 3], false)]);
    }

    #[test]
    fn send_refuses_while_window_pending() {
        let mut adapter = ProtocolAdapter::new(FakeMac {
            pending: true,
            ..Default::default()
        });
        assert_eq!(adapter.send(&[1]), Err(SendError::TxBusy));
        assert!(adapter.mac().submitted.is_empty());
        assert!(!adapter.tx_in_progress());
    }

    #[test]
    fn send_refuses_while_tx_in_progress() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        adapter.send(&[1]).unwrap();
        assert_eq!(adapter.send(&[2]), Err(SendError::TxBusy));
        assert_eq!(adapter.mac().submitted.len(), 1);
    }

    #[test]
    fn mac_answers_map_to_send_errors() {
        let mut adapter = ProtocolAdapter::new(FakeMac {
            answer: Some(TxResult::LengthError),
            ..Default::default()
        });
        assert_eq!(
            adapter.send(&[0; 60]),
            Err(SendError::FrameTooLong { len: 60, max: 51 })
        );
        assert!(!adapter.tx_in_progress());

        adapter.mac_mut().answer = Some(TxResult::Busy);
        assert_eq!(adapter.send(&[0]), Err(SendError::TxBusy));
    }

    // ── events ────────────────────────────────────────────────────────────────

    #[test]
    fn joined_disables_link_check_and_requests_time() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        assert_eq!(event(&mut adapter, MacEvent::Joined), None);
        assert!(adapter.is_joined());
        assert_eq!(adapter.mac().link_check, Some(false));
        assert_eq!(adapter.mac().time_requests, 1);
    }

    #[test]
    fn tx_complete_clears_flag_and_forwards_downlink() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        adapter.send(&[1]).unwrap();
        adapter.mac_mut().rx = vec![0xAA, 0xBB];
        adapter.mac_mut().ack = true;

        let ev = event(&mut adapter, MacEvent::TxComplete);
        assert!(!adapter.tx_in_progress());
        assert_eq!(ev, Some(DomainEvent::DownlinkReceived(vec![0xAA, 0xBB])));
    }

    #[test]
    fn tx_complete_without_downlink_yields_nothing() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        adapter.send(&[1]).unwrap();
        assert_eq!(event(&mut adapter, MacEvent::TxComplete), None);
        assert!(!adapter.tx_in_progress());
    }

    #[test]
    fn ping_slot_downlink_is_forwarded() {
        let mut adapter = ProtocolAdapter::new(FakeMac {
            rx: vec![7],
            ..Default::default()
        });
        assert_eq!(
            event(&mut adapter, MacEvent::RxComplete),
            Some(DomainEvent::DownlinkReceived(vec![7]))
        );
    }

    #[test]
    fn join_failures_are_counted_until_joined() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        event(&mut adapter, MacEvent::JoinFailed);
        event(&mut adapter, MacEvent::RejoinFailed);
        assert_eq!(adapter.join_failures(), 2);
        event(&mut adapter, MacEvent::Joined);
        assert_eq!(adapter.join_failures(), 0);
    }

    #[test]
    fn reset_releases_pending_transmit() {
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        event(&mut adapter, MacEvent::Joined);
        adapter.send(&[1]).unwrap();
        assert!(adapter.tx_in_progress());

        // No TXCOMPLETE follows a reset.
        assert_eq!(event(&mut adapter, MacEvent::Reset), None);
        assert!(!adapter.tx_in_progress());
        assert!(!adapter.is_joined());

        assert_eq!(adapter.send(&[2]), Ok(()));
        assert_eq!(adapter.mac().submitted.len(), 2);
    }

    #[test]
    fn network_time_needs_success_and_reference() {
        let reference = NetworkTimeReference {
            epoch_secs: 1_700_000_000,
            local_uptime_secs: 10,
        };
        let mut adapter = ProtocolAdapter::new(FakeMac::default());
        assert_eq!(
            adapter.handle(StackCallback::NetworkTime { success: true }, &now()),
            None,
            "no reference available"
        );

        adapter.mac_mut().time_ref = Some(reference);
        assert_eq!(
            adapter.handle(StackCallback::NetworkTime { success: false }, &now()),
            None
        );
        assert_eq!(
            adapter.handle(StackCallback::NetworkTime { success: true }, &now()),
            Some(DomainEvent::TimeUpdated(reference))
        );
    }
}
