use crate::types::{Reading, Submission};

/// Consumer of sensor readings.
///
/// `submit` is called from the sensor event delivery context, potentially at a
/// high rate. Implementations must return without waiting on I/O.
pub trait ReadingSink: Send + Sync {
    fn submit(&self, reading: Reading) -> Submission;
}
