//! Bridge configuration: defaults, JSON config file and validation.
//!
//! Command-line and environment overrides are layered on top by
//! [`crate::cli::Args::apply_to`].

pub mod paths;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use paths::get_default_config_path;

/// Pan/tilt controller default endpoint.
pub const DEFAULT_ACTUATOR_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 137, 209)), 4210);

/// ODAS tracked-source (SST) datagram port.
pub const DEFAULT_TRACKED_PORT: u16 = 9900;

/// ODAS potential-source (SSL) datagram port.
pub const DEFAULT_CANDIDATE_PORT: u16 = 9901;

pub const DEFAULT_BUFFER_SIZE: usize = 4096;

pub const DEFAULT_SEND_INTERVAL_MS: u64 = 10;

/// Top-level config.json shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Where `AZ .. EL ..` commands are sent.
    pub actuator_addr: SocketAddr,
    /// Local address the inbound sockets bind to.
    pub bind_host: IpAddr,
    pub tracked_port: u16,
    pub candidate_port: u16,
    /// Receive buffer per datagram, in bytes. Longer datagrams are truncated.
    pub buffer_size: usize,
    pub send_interval_ms: u64,
    /// ODAS SST TCP stream. Disabled when unset.
    pub tcp_tracked_port: Option<u16>,
    /// ODAS SSL TCP stream. Disabled when unset.
    pub tcp_candidate_port: Option<u16>,
    pub arbitration: ArbitrationConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            actuator_addr: DEFAULT_ACTUATOR_ADDR,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            tracked_port: DEFAULT_TRACKED_PORT,
            candidate_port: DEFAULT_CANDIDATE_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            send_interval_ms: DEFAULT_SEND_INTERVAL_MS,
            tcp_tracked_port: None,
            tcp_candidate_port: None,
            arbitration: ArbitrationConfig::default(),
        }
    }
}

/// Tuning for source matching and lock arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Candidates at or below this energy never produce a match.
    pub energy_threshold: f64,
    /// Tracks at or below this activity are treated as inactive.
    pub activity_threshold: f64,
    /// Max Euclidean distance between a candidate and a track to link them.
    pub match_distance: f64,
    /// A challenger must exceed the locked source's energy by this factor.
    pub switch_margin: f64,
    /// Per-axis tolerance when finding the locked track's candidate energy.
    pub coord_tolerance: f64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.5,
            activity_threshold: 0.0,
            match_distance: 0.15,
            switch_margin: 1.2,
            coord_tolerance: 0.01,
        }
    }
}

impl BridgeConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn tracked_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.tracked_port)
    }

    pub fn candidate_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.candidate_port)
    }

    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.buffer_size == 0 {
            anyhow::bail!("buffer_size must be greater than zero");
        }
        if self.send_interval_ms == 0 {
            anyhow::bail!("send_interval_ms must be greater than zero");
        }
        // Port 0 asks the OS for an ephemeral port, so two zeros never collide.
        if self.tracked_port != 0 && self.tracked_port == self.candidate_port {
            anyhow::bail!(
                "tracked_port and candidate_port must differ (both are {})",
                self.tracked_port
            );
        }
        if let (Some(t), Some(c)) = (self.tcp_tracked_port, self.tcp_candidate_port) {
            if t != 0 && t == c {
                anyhow::bail!("tcp_tracked_port and tcp_candidate_port must differ (both are {t})");
            }
        }
        let a = &self.arbitration;
        if !(a.match_distance > 0.0) {
            anyhow::bail!("arbitration.match_distance must be positive");
        }
        if !(a.switch_margin > 0.0) {
            anyhow::bail!("arbitration.switch_margin must be positive");
        }
        if !(a.coord_tolerance >= 0.0) {
            anyhow::bail!("arbitration.coord_tolerance must not be negative");
        }
        Ok(())
    }
}

/// Load the config file.
///
/// An explicit `path` must exist and parse. Without one, the platform
/// default location is tried and any problem there falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        }
        None => Ok(read_json_file(&get_default_config_path()).unwrap_or_default()),
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}
