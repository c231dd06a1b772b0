//! Application context: owns the config and the shared tracker, binds every
//! socket up front, then runs the listener and sender tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::net::{Listener, Sender, TcpIngest};
use crate::tracking::{Category, TrackingState};

pub struct App {
    config: BridgeConfig,
    state: Arc<TrackingState>,
}

impl App {
    pub fn new(config: BridgeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let state = Arc::new(TrackingState::new(config.arbitration));
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &Arc<TrackingState> {
        &self.state
    }

    /// Bind all inbound and outbound sockets.
    ///
    /// Any failure aborts before a single task is running.
    pub async fn bind(self) -> anyhow::Result<BoundApp> {
        let cfg = &self.config;
        let tracked = Listener::bind(
            cfg.tracked_addr(),
            Category::Tracked,
            cfg.buffer_size,
            Arc::clone(&self.state),
        )
        .await?;
        let candidates = Listener::bind(
            cfg.candidate_addr(),
            Category::Candidate,
            cfg.buffer_size,
            Arc::clone(&self.state),
        )
        .await?;

        let mut tcp = Vec::new();
        for (port, category) in [
            (cfg.tcp_tracked_port, Category::Tracked),
            (cfg.tcp_candidate_port, Category::Candidate),
        ] {
            if let Some(port) = port {
                let addr = SocketAddr::new(cfg.bind_host, port);
                tcp.push(TcpIngest::bind(addr, category, Arc::clone(&self.state)).await?);
            }
        }

        let sender = Sender::bind(
            cfg.actuator_addr,
            cfg.send_interval(),
            Arc::clone(&self.state),
        )
        .await?;

        Ok(BoundApp {
            tracked,
            candidates,
            tcp,
            sender,
        })
    }
}

/// Addresses the bridge actually bound, useful with port 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAddrs {
    pub tracked: SocketAddr,
    pub candidate: SocketAddr,
    pub tcp_tracked: Option<SocketAddr>,
    pub tcp_candidate: Option<SocketAddr>,
}

pub struct BoundApp {
    tracked: Listener,
    candidates: Listener,
    tcp: Vec<TcpIngest>,
    sender: Sender,
}

impl BoundApp {
    pub fn local_addrs(&self) -> std::io::Result<BoundAddrs> {
        let mut addrs = BoundAddrs {
            tracked: self.tracked.local_addr()?,
            candidate: self.candidates.local_addr()?,
            tcp_tracked: None,
            tcp_candidate: None,
        };
        for ingest in &self.tcp {
            let addr = ingest.local_addr()?;
            match ingest.category() {
                Category::Tracked => addrs.tcp_tracked = Some(addr),
                Category::Candidate => addrs.tcp_candidate = Some(addr),
            }
        }
        Ok(addrs)
    }

    /// Start every task on the current runtime.
    pub fn spawn(self) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        tasks.spawn(self.tracked.run());
        tasks.spawn(self.candidates.run());
        for ingest in self.tcp {
            tasks.spawn(ingest.run());
        }
        tasks.spawn(self.sender.run());
        tasks
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(actuator = %self.sender.target(), "Bridge running");
        let mut tasks = self.spawn();

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutting down");
            }
            Some(res) = tasks.join_next() => {
                // The loops never return; reaching here means a task panicked.
                if let Err(e) = res {
                    anyhow::bail!("Bridge task failed: {e}");
                }
            }
        }

        tasks.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn local_config(actuator: SocketAddr) -> BridgeConfig {
        BridgeConfig {
            actuator_addr: actuator,
            bind_host: "127.0.0.1".parse().unwrap(),
            tracked_port: 0,
            candidate_port: 0,
            send_interval_ms: 5,
            ..Default::default()
        }
    }

    async fn recv_until(actuator: &UdpSocket, expected: &str) -> String {
        let mut buf = [0u8; 64];
        let mut last = String::new();
        for _ in 0..200 {
            let n = tokio::time::timeout(Duration::from_secs(2), actuator.recv(&mut buf))
                .await
                .expect("actuator received nothing")
                .unwrap();
            last = String::from_utf8_lossy(&buf[..n]).into_owned();
            if last == expected {
                break;
            }
        }
        last
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = BridgeConfig::default();
        cfg.send_interval_ms = 0;
        assert!(App::new(cfg).is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_udp() {
        let actuator = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let app = App::new(local_config(actuator.local_addr().unwrap())).unwrap();
        let state = Arc::clone(app.state());
        let bound = app.bind().await.unwrap();
        let addrs = bound.local_addrs().unwrap();
        let mut tasks = bound.spawn();

        let odas = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        odas.send_to(
            br#"{"timeStamp": 10, "src": [{"x": 0.0, "y": -1.0, "z": 0.0, "E": 1.0}]}"#,
            addrs.candidate,
        )
        .await
        .unwrap();
        odas.send_to(
            br#"{"timeStamp": 10, "src": [{"id": 3, "x": 0.0, "y": -1.0, "z": 0.0, "activity": 1.0}]}"#,
            addrs.tracked,
        )
        .await
        .unwrap();

        // The idle command is also "AZ 0.0 EL 0.0", so wait for the lock first.
        for _ in 0..200 {
            if state.snapshot().locked_id.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(state.snapshot().locked_id, Some(3));
        assert_eq!(recv_until(&actuator, "AZ 0.0 EL 0.0\n").await, "AZ 0.0 EL 0.0\n");

        // The source moves to the side and the lock follows it.
        odas.send_to(
            br#"{"src": [{"x": 1.0, "y": 0.0, "z": 0.0, "E": 1.0}]}"#,
            addrs.candidate,
        )
        .await
        .unwrap();
        odas.send_to(
            br#"{"src": [{"id": 3, "x": 1.0, "y": 0.0, "z": 0.0, "activity": 1.0}]}"#,
            addrs.tracked,
        )
        .await
        .unwrap();
        assert_eq!(recv_until(&actuator, "AZ 90.0 EL 0.0\n").await, "AZ 90.0 EL 0.0\n");

        tasks.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_failure_aborts_startup() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut cfg = local_config("127.0.0.1:9".parse().unwrap());
        cfg.candidate_port = taken.local_addr().unwrap().port();
        let app = App::new(cfg).unwrap();
        let err = app.bind().await.err().unwrap();
        assert!(format!("{err:#}").contains("candidate"));
    }

    #[tokio::test]
    async fn test_tcp_ingest_is_optional() {
        let mut cfg = local_config("127.0.0.1:9".parse().unwrap());
        let bound = App::new(cfg.clone()).unwrap().bind().await.unwrap();
        let addrs = bound.local_addrs().unwrap();
        assert!(addrs.tcp_tracked.is_none() && addrs.tcp_candidate.is_none());
        drop(bound);

        cfg.tcp_tracked_port = Some(0);
        cfg.tcp_candidate_port = Some(0);
        let bound = App::new(cfg).unwrap().bind().await.unwrap();
        let addrs = bound.local_addrs().unwrap();
        assert!(addrs.tcp_tracked.is_some() && addrs.tcp_candidate.is_some());
        assert_ne!(addrs.tcp_tracked, addrs.tcp_candidate);
    }
}
