//! ODAS bridge: follows the active sound source reported by an ODAS
//! microphone-array pipeline and streams its azimuth/elevation to a
//! pan/tilt actuator over UDP.
//!
//! Reports arrive as JSON on two UDP ports (tracked and potential sources)
//! and optionally on ODAS's TCP sinks. Each report re-runs lock arbitration
//! in [`tracking::TrackingState`]; a fixed-rate sender reads the lock and
//! emits `AZ <az> EL <el>` lines.

pub mod app;
pub mod cli;
pub mod config;
pub mod logger;
pub mod net;
pub mod tracking;

pub use app::App;
pub use config::BridgeConfig;
