//! Inbound UDP listeners, one socket per report category.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::tracking::{Category, LockEvent, SourceReport, TrackingState};

/// Pause after a socket-level receive error before trying again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Parse one JSON report and feed it to the tracker.
///
/// `Ok(None)` covers both "no sources in this report" and "arbitration had
/// nothing to do". Errors are decode failures for the caller to log.
pub fn handle_payload(
    state: &TrackingState,
    category: Category,
    payload: &[u8],
) -> Result<Option<LockEvent>, serde_json::Error> {
    let report: SourceReport = serde_json::from_slice(payload)?;
    Ok(apply_report(state, category, report))
}

pub(crate) fn apply_report(
    state: &TrackingState,
    category: Category,
    report: SourceReport,
) -> Option<LockEvent> {
    let sources = report.into_sources()?;
    state.update(category, sources)
}

/// A bound UDP socket receiving one category of ODAS reports.
pub struct Listener {
    socket: UdpSocket,
    category: Category,
    buffer_size: usize,
    state: Arc<TrackingState>,
}

impl Listener {
    /// Bind the socket. Fails if the port is taken.
    pub async fn bind(
        addr: SocketAddr,
        category: Category,
        buffer_size: usize,
        state: Arc<TrackingState>,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {category} listener on UDP {addr}"))?;
        Ok(Self {
            socket,
            category,
            buffer_size,
            state,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive forever. Bad datagrams are logged and skipped.
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            info!(category = %self.category, %addr, "Listening for source reports");
        }

        let mut buf = vec![0u8; self.buffer_size];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    if let Err(e) = handle_payload(&self.state, self.category, &buf[..len]) {
                        warn!(
                            category = %self.category,
                            %peer,
                            bytes = len,
                            "Discarding malformed report: {}", e
                        );
                    }
                }
                Err(e) => {
                    // Platforms surface ICMP errors on UDP sockets; keep going.
                    debug!(category = %self.category, "UDP recv error: {}", e);
                    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                }
            }
        }
    }
}
