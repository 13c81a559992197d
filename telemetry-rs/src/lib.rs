//! # Crate telemetry-rs
//!
//! ## telemetry-rs
//!
//! The `telemetry-rs` crate streams phone motion sensor readings to a remote host over a plain
//! TCP socket, one newline-terminated JSON object per reading:
//!
//! ```text
//! {"ax":0.1,"ay":-0.2,"az":9.81}
//! {"gx":0.0,"gy":0.01,"gz":-0.5}
//! ```
//!
//! Features include:
//! - A connection manager owning the single outbound connection: background connect with
//!   timeout, idempotent teardown, and an opt-in reconnect policy.
//! - A telemetry sender whose `submit` never blocks the sensor callback. Readings go through a
//!   bounded queue drained by one writer task, so they reach the wire in submission order.
//! - Best-effort, at-most-once delivery: readings submitted while disconnected, or that fail to
//!   be written, are dropped and logged, never retried.
//! - Registration of listeners to receive the delivery outcome of each reading.
//! - A mock sensor source and a service runner for demos and tests.
//!
//! **NOTE** The target server is trusted and pre-configured. There is no authentication or
//! encryption on the wire.

pub mod adapters;
pub mod codec;
pub mod config;
pub mod connection;
pub mod delivery;
pub mod errors;
pub(crate) mod models;
pub mod sender;
pub mod services;

pub use config::TelemetryConfig;
pub use connection::{ConnectionManager, ConnectionState, ConnectionWriter, RetryPolicy};
pub use delivery::{DeliveryEvent, DeliveryReporter, DeliveryStats, Listener};
pub use errors::TelemetryError;
pub use sender::TelemetrySender;
