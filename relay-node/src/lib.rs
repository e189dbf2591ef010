/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Relay-node – LoRaWAN endpoint that switches a pair of relays on a weekly
//! schedule pushed by a control server.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── clock/        – wall-clock seeded from the network or an init downlink
//! ├── schedule/     – weekly schedule store and matching rule
//! ├── relay/        – relay actuation and cached port levels
//! ├── codec/        – MessagePack command objects (uplink / downlink)
//! ├── uplink/       – single-slot uplink staging
//! ├── radio/        – MAC contract + host simulation
//! ├── protocol/     – MAC callbacks → domain events, tx-in-flight tracking
//! ├── control/      – the periodic control loop (Endpoint)
//! ├── bootstrap/    – power-on wiring
//! └── config/       – YAML endpoint configuration
//! ```

pub mod bootstrap;
pub mod clock;
pub mod codec;
pub mod config;
pub mod control;
pub mod protocol;
pub mod radio;
pub mod relay;
pub mod schedule;
pub mod uplink;
