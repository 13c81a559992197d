//! Ownership of the single outbound TCP connection.
//!
//! `ConnectionManager` is the only place holding socket state. The sender reaches
//! the socket through the cloneable `ConnectionWriter` returned by
//! `current_writer`, never through shared fields.

mod manager;
mod retry;
mod writer;

pub use manager::{ConnectionManager, ConnectionState};
pub use retry::RetryPolicy;
pub use writer::ConnectionWriter;
