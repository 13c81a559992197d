//! General functionality for `telemetry-rs` library
//!
//! Holds the sensor data model shared by sources, the telemetry sender and
//! the test helpers: 3-axis vectors, sensor type tags, timestamped readings and
//! the traits that connect a reading source with a reading sink.

pub mod constants;

#[doc(hidden)]
pub mod traits;
#[doc(hidden)]
pub mod types;

// Re-export traits
#[doc(inline)]
pub use traits::{ReadingSink, ReadingSource};

// Re-export types
#[doc(inline)]
pub use types::{Clock, DropReason, Reading, SensorType, Submission, XYZ};
