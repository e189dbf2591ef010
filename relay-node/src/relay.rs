/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Relay actuation.
//!
//! [`RelayController`] keeps the last level written to each port and only
//! touches the physical output when the desired level differs.  Port 0 is
//! driven by the schedule; port 1 is reserved and stays OFF.

use tracing::{info, warn};

/// Number of relay ports on the board.
pub const RELAY_PORTS: usize = 2;

/// Cached level of each relay port, `[port0, port1]`.
pub type RelayState = [bool; RELAY_PORTS];

// ── Driver seam ───────────────────────────────────────────────────────────────

/// Physical output for the relays (the GPIO driver lives behind this).
pub trait RelayDriver {
    fn drive(&mut self, port: usize, on: bool);
}

/// In-memory relay pins: records the level of each port and how many
/// writes reached the hardware.
#[derive(Debug, Default, Clone)]
pub struct SimPins {
    levels: RelayState,
    writes: usize,
}

impl SimPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, port: usize) -> bool {
        self.levels.get(port).copied().unwrap_or(false)
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl RelayDriver for SimPins {
    fn drive(&mut self, port: usize, on: bool) {
        if let Some(level) = self.levels.get_mut(port) {
            *level = on;
            self.writes += 1;
        }
    }
}

// ── RelayController ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RelayController<D: RelayDriver> {
    driver: D,
    state: RelayState,
}

impl<D: RelayDriver> RelayController<D> {
    /// All ports start OFF.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: [false; RELAY_PORTS],
        }
    }

    /// Converge `port` to `desired`.  Unknown ports are ignored.
    pub fn apply(&mut self, port: usize, desired: bool) {
        let Some(current) = self.state.get_mut(port) else {
            warn!(port, "ignoring relay command for unknown port");
            return;
        };
        if *current == desired {
            return;
        }
        self.driver.drive(port, desired);
        *current = desired;
        info!(
            port,
            state = if desired { "ON" } else { "OFF" },
            "relay transition"
        );
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relays_start_off() {
        let relays = RelayController::new(SimPins::new());
        assert_eq!(relays.state(), [false, false]);
        assert_eq!(relays.driver().writes(), 0);
    }

    #[test]
    fn transition_drives_the_output_once() {
        let mut relays = RelayController::new(SimPins::new());
        relays.apply(0, true);
        relays.apply(0, true);
        assert_eq!(relays.state(), [true, false]);
        assert!(relays.driver().level(0));
        assert_eq!(relays.driver().writes(), 1, "repeat command is a no-op");

        relays.apply(0, false);
        assert!(!relays.driver().level(0));
        assert_eq!(relays.driver().writes(), 2);
    }

    #[test]
    fn unknown_port_is_ignored() {
        let mut relays = RelayController::new(SimPins::new());
        relays.apply(RELAY_PORTS, true);
        assert_eq!(relays.state(), [false, false]);
        assert_eq!(relays.driver().writes(), 0);
    }
}
