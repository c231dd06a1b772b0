//! Periodic actuator command sender.
//!
//! Every tick the current lock snapshot is formatted as `AZ <az> EL <el>\n`
//! and sent to the actuator, whether or not it changed. Delivery is
//! fire-and-forget.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::tracking::TrackingState;

pub struct Sender {
    socket: UdpSocket,
    target: SocketAddr,
    interval: Duration,
    state: Arc<TrackingState>,
}

impl Sender {
    /// Bind an ephemeral local socket of the target's address family.
    pub async fn bind(
        target: SocketAddr,
        interval: Duration,
        state: Arc<TrackingState>,
    ) -> anyhow::Result<Self> {
        let local: IpAddr = match target {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0))
            .await
            .context("Failed to bind actuator socket")?;
        Ok(Self {
            socket,
            target,
            interval,
            state,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send forever. Send failures are logged, never fatal.
    pub async fn run(self) {
        info!(
            target_addr = %self.target,
            interval_ms = self.interval.as_millis() as u64,
            "Streaming angles to actuator"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failing = false;
        loop {
            ticker.tick().await;
            let command = self.state.snapshot().command();
            match self.socket.send_to(command.as_bytes(), self.target).await {
                Ok(_) => {
                    if failing {
                        info!(target_addr = %self.target, "Actuator reachable again");
                        failing = false;
                    }
                }
                Err(e) if failing => {
                    debug!(target_addr = %self.target, "Actuator send failed: {}", e);
                }
                Err(e) => {
                    warn!(target_addr = %self.target, "Actuator send failed: {}", e);
                    failing = true;
                }
            }
        }
    }
}
