use crate::constants::N_XYZ_COORDINATES;
use crate::types::{Clock, SensorType, XYZ};

/// One typed sensor sample: an accelerometer or gyroscope triple together with
/// the time it arrived from the sensor source.
///
/// Readings are immutable once created; fields are only reachable through
/// accessors.
///
/// # Examples
///
/// ```
/// use common::types::{Reading, SensorType};
///
/// let reading = Reading::accelerometer(1.0, 2.0, 3.0);
/// assert_eq!(reading.sensor_type(), SensorType::Accelerometer);
/// assert_eq!(reading.measurement().inner(), [1.0, 2.0, 3.0]);
///
/// // Platform sensor events may carry extra trailing values
/// let reading = Reading::from_event_values(SensorType::Gyroscope, &[0.1, 0.2, 0.3, 7.0]).unwrap();
/// assert_eq!(reading.measurement().inner(), [0.1, 0.2, 0.3]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    sensor_type: SensorType,
    measurement: XYZ,
    timestamp: Clock,
}

impl Reading {
    /// Creates a reading stamped with the current time.
    pub fn new(sensor_type: SensorType, measurement: XYZ) -> Self {
        Self::with_timestamp(sensor_type, measurement, Clock::now())
    }

    pub fn with_timestamp(sensor_type: SensorType, measurement: XYZ, timestamp: Clock) -> Self {
        Self {
            sensor_type,
            measurement,
            timestamp,
        }
    }

    pub fn accelerometer(ax: f32, ay: f32, az: f32) -> Self {
        Self::new(SensorType::Accelerometer, XYZ::new([ax, ay, az]))
    }

    pub fn gyroscope(gx: f32, gy: f32, gz: f32) -> Self {
        Self::new(SensorType::Gyroscope, XYZ::new([gx, gy, gz]))
    }

    /// Builds a reading from the raw value array of a sensor event. Only the first
    /// three values are used. Returns None if fewer than three values are present.
    pub fn from_event_values(sensor_type: SensorType, values: &[f32]) -> Option<Self> {
        if values.len() < N_XYZ_COORDINATES {
            return None;
        }
        XYZ::try_from(&values[..N_XYZ_COORDINATES])
            .ok()
            .map(|measurement| Self::new(sensor_type, measurement))
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn measurement(&self) -> XYZ {
        self.measurement
    }

    pub fn timestamp(&self) -> Clock {
        self.timestamp
    }
}
