//! Command-line flags. Every flag can also be set through its
//! `ODAS_BRIDGE_*` environment variable and overrides the config file.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::config::BridgeConfig;

#[derive(Parser, Debug, Default)]
#[command(
    name = "odas-bridge",
    version,
    about = "Steer a pan/tilt actuator toward the active ODAS sound source"
)]
pub struct Args {
    /// JSON config file (default: <config dir>/odas-bridge/config.json)
    #[arg(long, env = "ODAS_BRIDGE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write rolling log files into this directory
    #[arg(long, env = "ODAS_BRIDGE_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Actuator address (IP:PORT)
    #[arg(long, env = "ODAS_BRIDGE_ACTUATOR")]
    pub actuator: Option<SocketAddr>,

    /// Local address for inbound sockets
    #[arg(long, env = "ODAS_BRIDGE_BIND")]
    pub bind: Option<IpAddr>,

    /// UDP port for tracked-source (SST) reports
    #[arg(long, env = "ODAS_BRIDGE_TRACKED_PORT")]
    pub tracked_port: Option<u16>,

    /// UDP port for potential-source (SSL) reports
    #[arg(long, env = "ODAS_BRIDGE_CANDIDATE_PORT")]
    pub candidate_port: Option<u16>,

    /// TCP port accepting ODAS's SST socket sink
    #[arg(long, env = "ODAS_BRIDGE_TCP_TRACKED_PORT")]
    pub tcp_tracked_port: Option<u16>,

    /// TCP port accepting ODAS's SSL socket sink
    #[arg(long, env = "ODAS_BRIDGE_TCP_CANDIDATE_PORT")]
    pub tcp_candidate_port: Option<u16>,

    /// Receive buffer size per datagram, in bytes
    #[arg(long, env = "ODAS_BRIDGE_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Actuator command period in milliseconds
    #[arg(long, env = "ODAS_BRIDGE_SEND_INTERVAL_MS")]
    pub send_interval_ms: Option<u64>,

    /// Minimum candidate energy for a match
    #[arg(long, env = "ODAS_BRIDGE_ENERGY_THRESHOLD")]
    pub energy_threshold: Option<f64>,

    /// Minimum track activity for a match
    #[arg(long, env = "ODAS_BRIDGE_ACTIVITY_THRESHOLD")]
    pub activity_threshold: Option<f64>,

    /// Candidate-to-track link distance
    #[arg(long, env = "ODAS_BRIDGE_MATCH_DISTANCE")]
    pub match_distance: Option<f64>,

    /// Energy factor a challenger needs to take over the lock
    #[arg(long, env = "ODAS_BRIDGE_SWITCH_MARGIN")]
    pub switch_margin: Option<f64>,

    /// Per-axis tolerance locating the locked track's energy
    #[arg(long, env = "ODAS_BRIDGE_COORD_TOLERANCE")]
    pub coord_tolerance: Option<f64>,
}

impl Args {
    /// Overlay the flags that were given onto `cfg`.
    pub fn apply_to(&self, cfg: &mut BridgeConfig) {
        if let Some(v) = self.actuator {
            cfg.actuator_addr = v;
        }
        if let Some(v) = self.bind {
            cfg.bind_host = v;
        }
        if let Some(v) = self.tracked_port {
            cfg.tracked_port = v;
        }
        if let Some(v) = self.candidate_port {
            cfg.candidate_port = v;
        }
        if self.tcp_tracked_port.is_some() {
            cfg.tcp_tracked_port = self.tcp_tracked_port;
        }
        if self.tcp_candidate_port.is_some() {
            cfg.tcp_candidate_port = self.tcp_candidate_port;
        }
        if let Some(v) = self.buffer_size {
            cfg.buffer_size = v;
        }
        if let Some(v) = self.send_interval_ms {
            cfg.send_interval_ms = v;
        }

        let a = &mut cfg.arbitration;
        if let Some(v) = self.energy_threshold {
            a.energy_threshold = v;
        }
        if let Some(v) = self.activity_threshold {
            a.activity_threshold = v;
        }
        if let Some(v) = self.match_distance {
            a.match_distance = v;
        }
        if let Some(v) = self.switch_margin {
            a.switch_margin = v;
        }
        if let Some(v) = self.coord_tolerance {
            a.coord_tolerance = v;
        }
    }
}
