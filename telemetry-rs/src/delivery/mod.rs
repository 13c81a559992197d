//! Delivery outcome reporting.
//!
//! Every reading handed to the sender ends in exactly one `DeliveryEvent`:
//! written to the wire, dropped, or failed while writing. Listeners registered
//! on the `DeliveryReporter` are notified of each one.

mod listener;
mod macros;
mod reporter;

use common::types::{DropReason, Reading};

use crate::errors::TelemetryError;

pub use listener::{Callback, Listener};
pub use reporter::{DeliveryReporter, DeliveryStats};

#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryEvent {
    /// The reading was written and flushed to the connection.
    Sent { reading: Reading },
    /// The reading was discarded before reaching the socket.
    Dropped { reading: Reading, reason: DropReason },
    /// Writing the reading failed. It is not retried.
    Failed {
        reading: Reading,
        error: TelemetryError,
    },
}

impl DeliveryEvent {
    pub fn reading(&self) -> &Reading {
        match self {
            DeliveryEvent::Sent { reading }
            | DeliveryEvent::Dropped { reading, .. }
            | DeliveryEvent::Failed { reading, .. } => reading,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryEvent::Sent { .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, DeliveryEvent::Dropped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryEvent::Failed { .. })
    }
}
