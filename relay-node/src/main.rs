/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use relay_node::bootstrap::bootstrap;
use relay_node::clock::{SystemUptime, TimeSource};
use relay_node::config::EndpointConfig;
use relay_node::control::Job;
use relay_node::radio::sim::SimMac;
use relay_node::relay::SimPins;

/// How often queued MAC callbacks are drained into the endpoint.
const RADIO_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ── CLI argument definition ───────────────────────────────────────────────────

/// Scheduled relay endpoint running against the simulated MAC and control
/// server.
///
/// Example:
///   relay-node --config endpoint.yaml --start-epoch 1699948770 --max-ticks 20
#[derive(Debug, Parser)]
#[command(
    name = "relay-node",
    about = "Scheduled relay endpoint – control loop on a simulated LoRaWAN MAC",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML endpoint configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Stop after this many control-loop ticks (default: run until Ctrl-C).
    /// The first tick runs at power-on, so at least one is required.
    #[arg(
        short = 'n',
        long = "max-ticks",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    max_ticks: Option<u64>,

    /// Network time (epoch seconds) at power-on for the simulated network.
    #[arg(short = 'e', long = "start-epoch")]
    start_epoch: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // The log level lives in the configuration, so load it before logging is
    // up and report the outcome afterwards.
    let loaded = match &cli.config {
        Some(path) => EndpointConfig::load_from_file(path).map(Some),
        None => Ok(None),
    };
    let level = match &loaded {
        Ok(Some(cfg)) => cfg.log_level.clone(),
        _ => String::from("info"),
    };

    // Level is controlled by the RUST_LOG env-var, falling back to the
    // configured `log_level`.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    info!("Relay-node starting up...");

    let mut config = match loaded {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            warn!("No configuration file provided, using default endpoint settings");
            EndpointConfig::default()
        }
        Err(e) => {
            error!("Failed to load endpoint configuration: {:#}", e);
            process::exit(1);
        }
    };
    if let Some(epoch) = cli.start_epoch {
        config.simulation.start_epoch = epoch;
    }

    info!(
        region       = ?config.region,
        subband      = config.subband,
        tick_secs    = config.tick_interval_secs,
        start_epoch  = config.simulation.start_epoch,
        sim_schedule = config.simulation.schedule.len(),
        max_ticks    = ?cli.max_ticks,
        "Configuration"
    );

    run(&config, cli.max_ticks).await;
}

// ── Run loop ──────────────────────────────────────────────────────────────────

/// Single-threaded cooperative loop: the tick job and the MAC callbacks are
/// interleaved, each run to completion.
async fn run(config: &EndpointConfig, max_ticks: Option<u64>) {
    let uptime = SystemUptime::new();
    let boot = uptime.boot_instant();
    let deadline = |uptime_secs: u64| Instant::from_std(boot + Duration::from_secs(uptime_secs));

    let (mut endpoint, first) = bootstrap(
        config,
        SimMac::new(config.simulation.clone()),
        uptime,
        SimPins::new(),
    );

    let mut next_tick = deadline(endpoint.dispatch(first).unwrap_or(0));
    let mut ticks: u64 = 1;

    let mut radio_poll = tokio::time::interval(RADIO_POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            info!(ticks, "tick limit reached");
            break;
        }

        tokio::select! {
            _ = sleep_until(next_tick) => {
                let outcome = endpoint.tick();
                ticks += 1;
                next_tick = deadline(outcome.next_tick_at);
            }
            _ = radio_poll.tick() => {
                let now = uptime.uptime_secs();
                while let Some(callback) = endpoint.mac_mut().poll(now) {
                    endpoint.dispatch(Job::Stack(callback));
                }
            }
            _ = &mut shutdown => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    info!(
        relays    = ?endpoint.relay_state(),
        uplinks   = endpoint.mac().uplinks().len(),
        schedule  = endpoint.schedule().len(),
        clock_set = endpoint.clock().is_valid(),
        "Relay-node stopped"
    );
}
