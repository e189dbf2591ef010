/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! frame-decode – prints the command object inside a captured frame.
//!
//! Accepts the hex payload as shown by the network console (whitespace and
//! an optional `0x` prefix are ignored), or reads it from stdin.

use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use relay_node::clock::DateTimeParts;
use relay_node::codec::{self, Command};

#[derive(Debug, Parser)]
#[command(
    name = "frame-decode",
    about = "Decode a MessagePack command frame given as hex"
)]
struct Cli {
    /// Frame bytes in hex.  Read from stdin when omitted.
    frame: Option<String>,
}

fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        bail!("frame contains non-hex characters");
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits ({})", digits.len());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn describe(cmd: &Command) -> String {
    match cmd {
        Command::Start { my_time } => {
            format!("start  my-time={my_time} ({})", DateTimeParts::from_epoch(*my_time))
        }
        Command::Status { my_time, state } => format!(
            "status my-time={my_time} ({}) relay0={} relay1={}",
            DateTimeParts::from_epoch(*my_time),
            on_off(state[0]),
            on_off(state[1])
        ),
        Command::Init { cur_time, entries } => {
            let mut out = format!(
                "init   cur-time={cur_time} ({}) entries={}",
                DateTimeParts::from_epoch(*cur_time),
                entries.len()
            );
            for (i, e) in entries.iter().enumerate() {
                out.push_str(&format!(
                    "\n  #{i:<2} dow={} tm={} {}",
                    e.dow,
                    e.time_of_day(),
                    on_off(e.desired)
                ));
            }
            out
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let text = match cli.frame {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read frame from stdin")?;
            buf
        }
    };

    let bytes = from_hex(&text)?;
    debug!(len = bytes.len(), "decoding frame");
    let cmd = codec::decode(&bytes)?;
    println!("{}", describe(&cmd));
    Ok(())
}
