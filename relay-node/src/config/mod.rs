//! Endpoint configuration loading.
//!
//! Everything is optional; missing values fall back to the defaults below.
//!
//! ```yaml
//! credentials:
//!   app_eui: "70B3D57ED0030C76"      # as printed by the network console (MSB first)
//!   dev_eui: "48414E4741524639"
//!   app_key: "D936C1B36996632203375334348B09FF"
//! region: us915
//! subband: 1
//! tick_interval_secs: 30
//! log_level: info
//! simulation:
//!   join_delay_secs: 6
//!   airtime_secs: 2
//!   max_payload: 51
//!   start_epoch: 1700000000
//!   reply_to_start: true
//!   schedule:
//!     - { st: true,  dow: 2, tm: "0800" }
//!     - { st: false, dow: 2, tm: "1700" }
//! ```

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::control::TICK_INTERVAL_SECS;
use crate::radio::sim::SimConfig;
use crate::radio::Credentials;
use crate::schedule::{EntryFault, ScheduleEntry};

// ── Defaults ──────────────────────────────────────────────────────────────────

// Little-endian, as handed to the MAC (printed: 70B3D57ED0030C76).
const DEFAULT_APP_EUI: [u8; 8] = [0x76, 0x0C, 0x03, 0xD0, 0x7E, 0xD5, 0xB3, 0x70];
// Printed: 48414E4741524639.
const DEFAULT_DEV_EUI: [u8; 8] = [0x39, 0x46, 0x52, 0x41, 0x47, 0x4E, 0x41, 0x48];
const DEFAULT_APP_KEY: [u8; 16] = [
    0xD9, 0x36, 0xC1, 0xB3, 0x69, 0x96, 0x63, 0x22, 0x03, 0x37, 0x53, 0x34, 0x34, 0x8B, 0x09, 0xFF,
];

/// Zero-based US915 sub-band recommended by the network operator.
const DEFAULT_SUBBAND: u8 = 1;

const DEFAULT_LOG_LEVEL: &str = "info";

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EndpointConfigFile {
    #[serde(default)]
    credentials: CredentialsEntry,
    region: Option<Region>,
    subband: Option<u8>,
    tick_interval_secs: Option<u64>,
    log_level: Option<String>,
    #[serde(default)]
    simulation: SimulationEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsEntry {
    app_eui: Option<String>,
    dev_eui: Option<String>,
    app_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationEntry {
    join_delay_secs: Option<u64>,
    airtime_secs: Option<u64>,
    max_payload: Option<usize>,
    start_epoch: Option<u64>,
    reply_to_start: Option<bool>,
    #[serde(default)]
    schedule: Vec<ScheduleDescriptor>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Regional channel plan the endpoint was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Us915,
    Eu868,
}

impl Region {
    /// The region selected by the `us915` cargo feature.
    pub fn for_build() -> Self {
        if cfg!(feature = "us915") {
            Region::Us915
        } else {
            Region::Eu868
        }
    }
}

/// A schedule descriptor as written by operators, `{st, dow, tm}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleDescriptor {
    pub st: bool,
    pub dow: i64,
    pub tm: String,
}

impl ScheduleDescriptor {
    pub fn to_entry(&self) -> std::result::Result<ScheduleEntry, EntryFault> {
        ScheduleEntry::from_descriptor(self.dow, &self.tm, self.st)
    }
}

/// Parse a list of descriptors, naming the first bad one.
pub fn parse_schedule(descriptors: &[ScheduleDescriptor]) -> Result<Vec<ScheduleEntry>> {
    descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| {
            d.to_entry()
                .with_context(|| format!("schedule entry #{i} ({d:?}) is invalid"))
        })
        .collect()
}

/// Fully resolved endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub credentials: Credentials,
    pub region: Region,
    /// Only applied when `region` is [`Region::Us915`].
    pub subband: u8,
    pub tick_interval_secs: u64,
    pub log_level: String,
    pub simulation: SimConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::new(DEFAULT_APP_EUI, DEFAULT_DEV_EUI, DEFAULT_APP_KEY),
            region: Region::for_build(),
            subband: DEFAULT_SUBBAND,
            tick_interval_secs: TICK_INTERVAL_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            simulation: SimConfig {
                start_epoch: host_epoch_now(),
                ..SimConfig::default()
            },
        }
    }
}

impl EndpointConfig {
    /// Parse `path` into a configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is invalid, or
    /// a value is out of range (bad hex credential, tick interval outside
    /// `1..=60`, malformed schedule descriptor).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading endpoint configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: EndpointConfigFile =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;
        let config = Self::resolve(file)?;

        debug!(
            dev_eui = %config.credentials.dev_eui_display(),
            region = ?config.region,
            subband = config.subband,
            tick_interval_secs = config.tick_interval_secs,
            sim_schedule = config.simulation.schedule.len(),
            "endpoint configuration resolved"
        );
        Ok(config)
    }

    fn resolve(file: EndpointConfigFile) -> Result<Self> {
        let creds = file.credentials;
        let credentials = Credentials::new(
            match creds.app_eui.as_deref() {
                Some(text) => eui_from_display("app_eui", text)?,
                None => DEFAULT_APP_EUI,
            },
            match creds.dev_eui.as_deref() {
                Some(text) => eui_from_display("dev_eui", text)?,
                None => DEFAULT_DEV_EUI,
            },
            match creds.app_key.as_deref() {
                Some(text) => parse_hex("app_key", text)?,
                None => DEFAULT_APP_KEY,
            },
        );

        let tick_interval_secs = file.tick_interval_secs.unwrap_or(TICK_INTERVAL_SECS);
        if !(1..=60).contains(&tick_interval_secs) {
            bail!(
                "tick_interval_secs must be within 1..=60 so every minute sees a tick, got {}",
                tick_interval_secs
            );
        }

        let sim = file.simulation;
        let defaults = SimConfig::default();
        let simulation = SimConfig {
            join_delay_secs: sim.join_delay_secs.unwrap_or(defaults.join_delay_secs),
            airtime_secs: sim.airtime_secs.unwrap_or(defaults.airtime_secs),
            max_payload: sim.max_payload.unwrap_or(defaults.max_payload),
            start_epoch: sim.start_epoch.unwrap_or_else(host_epoch_now),
            reply_to_start: sim.reply_to_start.unwrap_or(defaults.reply_to_start),
            schedule: parse_schedule(&sim.schedule)?,
        };

        Ok(Self {
            credentials,
            region: file.region.unwrap_or_else(Region::for_build),
            subband: file.subband.unwrap_or(DEFAULT_SUBBAND),
            tick_interval_secs,
            log_level: file
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            simulation,
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Decode exactly `N` bytes of hex (case-insensitive).
fn parse_hex<const N: usize>(field: &str, text: &str) -> Result<[u8; N]> {
    let text = text.trim();
    if text.len() != N * 2 || !text.is_ascii() {
        bail!(
            "{field} must be {} hex digits, got '{}'",
            N * 2,
            text
        );
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        let pair = &text[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .with_context(|| format!("{field}: '{pair}' is not a hex byte"))?;
    }
    Ok(out)
}

/// EUIs are printed MSB first but the MAC wants them little-endian.
fn eui_from_display(field: &str, text: &str) -> Result<[u8; 8]> {
    let mut eui = parse_hex::<8>(field, text)?;
    eui.reverse();
    Ok(eui)
}

fn host_epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
