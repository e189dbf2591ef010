/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! downlink-gen – plays the control server's side of startup.
//!
//! Reads a schedule YAML, validates it the way the endpoint will, and prints
//! the MessagePack `init` frame as one line of hex, ready to be scheduled as
//! a downlink on port 1 in the network console.
//!
//! ```yaml
//! cur_time: 1699948770          # optional, defaults to the host clock
//! schedule:
//!   - { st: true,  dow: 2, tm: "0800" }
//!   - { st: false, dow: 2, tm: "1700" }
//! ```

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use relay_node::codec::{self, Command, DEFAULT_MAX_PAYLOAD};
use relay_node::config::{parse_schedule, ScheduleDescriptor};
use relay_node::schedule::ScheduleStore;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "downlink-gen",
    about = "Encode a schedule YAML into an `init` downlink frame (hex)"
)]
struct Cli {
    /// Schedule YAML file.
    #[arg(short = 's', long = "schedule")]
    schedule: PathBuf,

    /// Override `cur_time` (epoch seconds).
    #[arg(short = 't', long = "cur-time")]
    cur_time: Option<u64>,

    /// Largest frame the region / data rate can carry.
    #[arg(short = 'm', long = "max-payload", default_value_t = DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,

    /// Emit the frame even if the endpoint would reject it.
    #[arg(long = "allow-invalid")]
    allow_invalid: bool,
}

// ── Schedule file ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleFile {
    cur_time: Option<u64>,
    #[serde(default)]
    schedule: Vec<ScheduleDescriptor>,
}

fn load(path: &Path) -> Result<ScheduleFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read schedule file '{}'", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse schedule file '{}'", path.display()))
}

fn host_epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ── Frame building ────────────────────────────────────────────────────────────

fn build_frame(
    file: &ScheduleFile,
    cur_time: u64,
    max_payload: usize,
    allow_invalid: bool,
) -> Result<Vec<u8>> {
    let entries = parse_schedule(&file.schedule)?;

    if let Err(e) = ScheduleStore::validate(&entries) {
        if !allow_invalid {
            return Err(e).context("the endpoint would reject this schedule");
        }
        warn!("emitting schedule the endpoint will reject: {e}");
    }

    let cmd = Command::Init { cur_time, entries };
    let limit = if allow_invalid { usize::MAX } else { max_payload };
    codec::encode(&cmd, limit).context("cannot encode init frame")
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = load(&cli.schedule)?;
    let cur_time = cli.cur_time.or(file.cur_time).unwrap_or_else(host_epoch_now);

    let frame = build_frame(&file, cur_time, cli.max_payload, cli.allow_invalid)?;
    info!(
        cur_time,
        entries = file.schedule.len(),
        len = frame.len(),
        "init frame built"
    );
    println!("{}", to_hex(&frame));
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
