/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Power-on wiring.
//!
//! Hands the credentials to the MAC, resets it, restricts the US915 channel
//! plan to the configured sub-band and builds a cold [`Endpoint`].  The
//! returned [`Job::Tick`] must be dispatched immediately; the first uplink
//! it sends starts the OTAA join.

use tracing::info;

use crate::clock::TimeSource;
use crate::config::{EndpointConfig, Region};
use crate::control::{Endpoint, Job};
use crate::radio::MacStack;
use crate::relay::RelayDriver;

pub fn bootstrap<M, T, D>(
    config: &EndpointConfig,
    mut mac: M,
    time: T,
    driver: D,
) -> (Endpoint<M, T, D>, Job)
where
    M: MacStack,
    T: TimeSource,
    D: RelayDriver,
{
    mac.init(&config.credentials);
    mac.reset();

    if config.region == Region::Us915 {
        // Only one block of eight channels is served by the gateways.
        mac.select_subband(config.subband);
    }

    info!(
        dev_eui = %config.credentials.dev_eui_display(),
        region = ?config.region,
        subband = config.subband,
        tick_interval_secs = config.tick_interval_secs,
        "endpoint bootstrapped"
    );

    let endpoint = Endpoint::new(mac, time, driver, config.tick_interval_secs);
    (endpoint, Job::Tick)
}
