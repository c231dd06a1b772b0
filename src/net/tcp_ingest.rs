//! TCP ingest for ODAS's native socket sinks.
//!
//! ODAS can stream SST/SSL reports over TCP as back-to-back JSON objects.
//! Reads rarely line up with object boundaries, so bytes are buffered in a
//! [`JsonSplitter`] and each complete object takes the same path as a UDP
//! datagram of that category.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::listener::apply_report;
use crate::tracking::{Category, SourceReport, TrackingState};

/// Read chunk size for TCP connections.
const READ_CHUNK: usize = 4096;

/// A peer that never closes an object cannot grow the buffer past this.
const MAX_PENDING: usize = 1 << 20;

/// Splits a byte stream into consecutive top-level JSON objects.
///
/// Framing by brace depth, not `serde_json::StreamDeserializer`, lets the
/// stream resync at the next `{` after junk or a malformed object.
#[derive(Debug, Default)]
pub struct JsonSplitter {
    pending: Vec<u8>,
}

impl JsonSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for the rest of an object.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append `bytes` and return every object completed by them.
    ///
    /// Objects are framed by brace depth before parsing, so a read that ends
    /// mid-number or mid-string just waits for more bytes. Non-whitespace
    /// junk between objects comes back as its own (usually `Err`) entry.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Value, serde_json::Error>> {
        self.pending.extend_from_slice(bytes);

        let mut out = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'{') {
            let start = consumed + offset;
            let skipped = &self.pending[consumed..start];
            if skipped.iter().any(|b| !b.is_ascii_whitespace()) {
                out.push(serde_json::from_slice(skipped));
            }
            consumed = start;

            let Some(len) = object_len(&self.pending[start..]) else {
                break;
            };
            out.push(serde_json::from_slice(&self.pending[start..start + len]));
            consumed = start + len;
        }
        if self.pending[consumed..].iter().all(u8::is_ascii_whitespace) {
            consumed = self.pending.len();
        }
        self.pending.drain(..consumed);

        if self.pending.len() > MAX_PENDING {
            warn!(bytes = self.pending.len(), "Dropping oversized partial report");
            self.pending.clear();
        }
        out
    }
}

/// Length of the object starting at `buf[0]`, or `None` if it is not closed yet.
fn object_len(buf: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Accepts ODAS TCP connections for one report category.
pub struct TcpIngest {
    listener: TcpListener,
    category: Category,
    state: Arc<TrackingState>,
}

impl TcpIngest {
    pub async fn bind(
        addr: SocketAddr,
        category: Category,
        state: Arc<TrackingState>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {category} ingest on TCP {addr}"))?;
        Ok(Self {
            listener,
            category,
            state,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            info!(category = %self.category, %addr, "Accepting ODAS TCP streams");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(handle_connection(stream, peer, self.category, state));
                }
                Err(e) => {
                    warn!(category = %self.category, "TCP accept failed: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    category: Category,
    state: Arc<TrackingState>,
) {
    info!(%category, %peer, "ODAS source online");

    let mut splitter = JsonSplitter::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(%category, %peer, "TCP read error: {}", e);
                break;
            }
        };
        for value in splitter.push(&buf[..n]) {
            let report = value.and_then(serde_json::from_value::<SourceReport>);
            match report {
                Ok(report) => {
                    apply_report(&state, category, report);
                }
                Err(e) => warn!(%category, %peer, "Discarding malformed report: {}", e),
            }
        }
    }

    if splitter.pending_len() > 0 {
        debug!(%category, bytes = splitter.pending_len(), "Connection closed mid-report");
    }
    info!(%category, %peer, "ODAS source offline");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArbitrationConfig;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_splitter_concatenated_objects() {
        let mut s = JsonSplitter::new();
        let out = s.push(b"{\"a\": 1}\n{\"a\": 2}\n{\"a\"");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].as_ref().unwrap()["a"], 2);
        assert!(s.pending_len() > 0);

        let out = s.push(b": 3}\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap()["a"], 3);
        assert_eq!(s.pending_len(), 0);
    }

    #[test]
    fn test_splitter_byte_at_a_time() {
        let input = br#"{"src": [{"id": 1, "x": 0.5}]} {"src": []}"#;
        let mut s = JsonSplitter::new();
        let mut values = Vec::new();
        for b in input.iter() {
            values.extend(s.push(std::slice::from_ref(b)));
        }
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.is_ok()));
    }

    #[test]
    fn test_splitter_braces_inside_strings() {
        let mut s = JsonSplitter::new();
        let out = s.push(br#"{"tag": "a}b{\"c"}"#);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap()["tag"], "a}b{\"c");
    }

    #[test]
    fn test_splitter_skips_malformed_object() {
        let mut s = JsonSplitter::new();
        let out = s.push(b"{\"src\": [1,]}\n{\"ok\": 1}");
        assert_eq!(out.len(), 2);
        assert!(out[0].is_err());
        assert_eq!(out[1].as_ref().unwrap()["ok"], 1);
    }

    #[test]
    fn test_splitter_resyncs_after_garbage() {
        let mut s = JsonSplitter::new();
        let out = s.push(b"}}garbage {\"ok\": true}\n");
        assert!(out.iter().any(|v| v.is_err()));
        let good: Vec<_> = out.into_iter().filter_map(Result::ok).collect();
        assert_eq!(good.len(), 1);
        assert_eq!(good[0]["ok"], true);
        assert_eq!(s.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_tcp_stream_drives_tracker() {
        let state = Arc::new(TrackingState::new(ArbitrationConfig::default()));
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let tracked = TcpIngest::bind(addr, Category::Tracked, state.clone()).await.unwrap();
        let cands = TcpIngest::bind(addr, Category::Candidate, state.clone()).await.unwrap();
        let tracked_addr = tracked.local_addr().unwrap();
        let cand_addr = cands.local_addr().unwrap();
        tokio::spawn(tracked.run());
        tokio::spawn(cands.run());

        let mut c = TcpStream::connect(cand_addr).await.unwrap();
        c.write_all(b"{\n  \"timeStamp\": 1,\n  \"src\": [\n    { \"x\": 1.0, \"y\": 0.0, ")
            .await
            .unwrap();
        c.write_all(b"\"z\": 0.0, \"E\": 0.9 }\n  ]\n}\n").await.unwrap();

        let mut t = TcpStream::connect(tracked_addr).await.unwrap();
        t.write_all(br#"{"timeStamp": 1, "src": [{"id": 12, "x": 1.0, "y": 0.0, "z": 0.0, "activity": 0.8}]}"#)
            .await
            .unwrap();

        let mut locked = None;
        for _ in 0..100 {
            locked = state.snapshot().locked_id;
            if locked.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(locked, Some(12));
        assert_eq!(state.snapshot().command(), "AZ 90.0 EL 0.0\n");
    }
}
