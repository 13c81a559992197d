use std::fmt;

/// Represents the sensor types whose readings can be streamed.
///
/// # Variants
///
/// - `Accelerometer`: 3-axis accelerometer [m/s^2].
/// - `Gyroscope`: 3-axis gyroscope [rad/s].
///
/// # Examples
///
/// ```
/// use common::types::SensorType;
///
/// let sensor = SensorType::try_from("Accelerometer").unwrap();
/// assert_eq!(sensor, SensorType::Accelerometer);
///
/// let sensor = SensorType::try_from("GYRO").unwrap();
/// assert_eq!(sensor, SensorType::Gyroscope);
///
/// assert!(SensorType::try_from("magnetometer").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
}

impl SensorType {
    pub const ALL: [SensorType; 2] = [SensorType::Accelerometer, SensorType::Gyroscope];
}

impl TryFrom<&str> for SensorType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower_case_value = value.to_lowercase();
        if lower_case_value.contains("acc") {
            Ok(Self::Accelerometer)
        } else if lower_case_value.contains("gyr") {
            Ok(Self::Gyroscope)
        } else {
            Err(format!("Unsupported sensor type: {}", value))
        }
    }
}

impl TryFrom<String> for SensorType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SensorType::try_from(value.as_str())
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Accelerometer => write!(f, "accelerometer"),
            SensorType::Gyroscope => write!(f, "gyroscope"),
        }
    }
}
