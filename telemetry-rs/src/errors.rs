//! Module errors

/// Represents the different types of errors that can occur while streaming telemetry.
///
/// None of these errors ever reach the sensor event producer: they are logged where
/// they happen and, for queued readings, reported as delivery events.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryError {
    /// Host unreachable, connection refused, DNS failure or connect timeout.
    #[error("Failed to connect: {0}")]
    ConnectFailure(String),

    /// A connect was requested while a connection is in progress or established.
    #[error("Connection already active: {0}")]
    AlreadyConnected(String),

    /// Broken pipe, reset or write timeout on an established connection.
    #[error("Failed to write: {0}")]
    WriteFailure(String),

    /// Write attempted on an endpoint that was closed by teardown.
    #[error("Write on closed connection: {0}")]
    TeardownRace(String),

    /// The reading cannot be represented on the wire.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// A wire line does not describe a reading.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TelemetryError>;
