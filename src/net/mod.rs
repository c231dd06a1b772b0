//! Network plumbing: inbound ODAS reports and outbound actuator commands.

pub mod listener;
pub mod sender;
pub mod tcp_ingest;

pub use listener::{handle_payload, Listener};
pub use sender::Sender;
pub use tcp_ingest::{JsonSplitter, TcpIngest};
