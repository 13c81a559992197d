pub mod clock;
pub mod reading;
pub mod sensor_type;
pub mod submission;
pub mod xyz;

pub use clock::Clock;
pub use reading::Reading;
pub use sensor_type::SensorType;
pub use submission::{DropReason, Submission};
pub use xyz::XYZ;
