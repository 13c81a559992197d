//! Test support for `telemetry-rs`: a loopback TCP server recording everything it
//! receives, and a recorder collecting listener notifications.

pub mod recorder;
pub mod stub_server;

pub use recorder::Recorder;
pub use stub_server::StubServer;
