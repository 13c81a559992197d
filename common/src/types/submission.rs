use std::fmt;

/// Why a reading was dropped instead of being written to the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// No connection was established when the reading was handled.
    NotConnected,
    /// The outgoing queue was at capacity.
    QueueFull,
    /// The sender had already been shut down.
    Closed,
    /// The reading could not be encoded (non-finite components).
    Unencodable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::NotConnected => "not connected",
            DropReason::QueueFull => "queue full",
            DropReason::Closed => "sender closed",
            DropReason::Unencodable => "unencodable reading",
        };
        write!(f, "{}", reason)
    }
}

/// Immediate outcome of handing a reading to a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The reading was accepted and will be written in the background.
    Queued,
    /// The reading was discarded and will never be sent.
    Dropped(DropReason),
}

impl Submission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Submission::Queued)
    }
}
