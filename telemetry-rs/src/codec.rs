//! Wire format of a reading: one single-line JSON object per reading.
//!
//! ```text
//! {"ax":<f32>,"ay":<f32>,"az":<f32>}
//! {"gx":<f32>,"gy":<f32>,"gz":<f32>}
//! ```
//!
//! Keys always appear in that order. Numbers are written as the shortest decimal
//! that parses back to the same `f32` and always carry a fraction or exponent,
//! so `1.0` stays `1.0`, `0.1` stays `0.1` and `1e-7` is written as `1e-7`.
//! The arrival timestamp is not part of the wire format. Non-finite components
//! have no JSON representation and are rejected.

use serde::{Deserialize, Serialize};

use common::types::{Reading, SensorType, XYZ};

use crate::errors::{Result, TelemetryError};

pub const LINE_TERMINATOR: char = '\n';

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccelerometerLine {
    ax: f32,
    ay: f32,
    az: f32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GyroscopeLine {
    gx: f32,
    gy: f32,
    gz: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireLine {
    Accelerometer(AccelerometerLine),
    Gyroscope(GyroscopeLine),
}

/// Returns the JSON line for `reading`, without line terminator.
/// Returns an Encode error if any component is NaN or infinite.
pub fn encode(reading: &Reading) -> Result<String> {
    let measurement = reading.measurement();
    if !measurement.is_finite() {
        return Err(TelemetryError::Encode(format!(
            "non-finite {} reading {:?}",
            reading.sensor_type(),
            measurement.inner()
        )));
    }
    let [x, y, z] = measurement.inner();
    let line = match reading.sensor_type() {
        SensorType::Accelerometer => serde_json::to_string(&AccelerometerLine {
            ax: x,
            ay: y,
            az: z,
        }),
        SensorType::Gyroscope => serde_json::to_string(&GyroscopeLine {
            gx: x,
            gy: y,
            gz: z,
        }),
    };
    line.map_err(|e| TelemetryError::Encode(e.to_string()))
}

/// Returns the JSON line for `reading` followed by the line terminator.
pub fn encode_line(reading: &Reading) -> Result<String> {
    let mut line = encode(reading)?;
    line.push(LINE_TERMINATOR);
    Ok(line)
}

/// Parses a wire line back into a reading, stamped with the current time.
/// A trailing line terminator is accepted.
/// Returns a Decode error if the line is not one of the two reading objects.
pub fn decode(line: &str) -> Result<Reading> {
    let line = line.trim_end_matches(['\r', '\n']);
    let wire: WireLine = serde_json::from_str(line).map_err(|_| {
        TelemetryError::Decode(format!("line is not a sensor reading: {}", line))
    })?;
    let reading = match wire {
        WireLine::Accelerometer(l) => {
            Reading::new(SensorType::Accelerometer, XYZ::new([l.ax, l.ay, l.az]))
        }
        WireLine::Gyroscope(l) => Reading::new(SensorType::Gyroscope, XYZ::new([l.gx, l.gy, l.gz])),
    };
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_accelerometer() {
        let reading = Reading::accelerometer(1.0, 2.0, 3.0);
        assert_eq!(encode(&reading).unwrap(), r#"{"ax":1.0,"ay":2.0,"az":3.0}"#);
    }

    #[test]
    fn test_encode_gyroscope() {
        let reading = Reading::gyroscope(-0.5, 0.0, 0.25);
        assert_eq!(encode(&reading).unwrap(), r#"{"gx":-0.5,"gy":0.0,"gz":0.25}"#);
    }

    #[test]
    fn test_encode_uses_shortest_f32_representation() {
        let reading = Reading::accelerometer(0.1, -9.81, 1e-7);
        assert_eq!(
            encode(&reading).unwrap(),
            r#"{"ax":0.1,"ay":-9.81,"az":1e-7}"#
        );
    }

    #[test]
    fn test_encode_line_appends_terminator() {
        let reading = Reading::gyroscope(1.5, 2.5, 3.5);
        let line = encode_line(&reading).unwrap();
        assert_eq!(line, "{\"gx\":1.5,\"gy\":2.5,\"gz\":3.5}\n");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let reading = Reading::accelerometer(0.0, value, 0.0);
            assert!(matches!(encode(&reading), Err(TelemetryError::Encode(_))));
        }
    }

    #[test]
    fn test_encoding_is_stable_through_decode() {
        let readings = [
            Reading::accelerometer(1.0, 2.0, 3.0),
            Reading::accelerometer(0.017_453_292, -9.806_65, 3.4e38),
            Reading::gyroscope(f32::MIN_POSITIVE, -0.0, 123_456.79),
            Reading::gyroscope(0.333_333_34, 1e-45, -2.5),
        ];
        for reading in readings {
            let encoded = encode(&reading).unwrap();
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded.sensor_type(), reading.sensor_type());
            assert_eq!(decoded.measurement(), reading.measurement());
            assert_eq!(encode(&decoded).unwrap(), encoded);
        }
    }

    #[test]
    fn test_decode_accepts_terminator() {
        let reading = decode("{\"gx\":1.0,\"gy\":2.0,\"gz\":3.0}\r\n").unwrap();
        assert_eq!(reading.sensor_type(), SensorType::Gyroscope);
        assert_eq!(reading.measurement().inner(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_decode_rejects_malformed_lines() {
        let lines = [
            "",
            "not json",
            r#"{"ax":1.0,"ay":2.0}"#,
            r#"{"ax":1.0,"ay":2.0,"az":3.0,"t":4.0}"#,
            r#"{"ax":1.0,"gy":2.0,"az":3.0}"#,
            r#"{"mx":1.0,"my":2.0,"mz":3.0}"#,
            r#"{"ax":"1.0","ay":2.0,"az":3.0}"#,
        ];
        for line in lines {
            assert!(
                matches!(decode(line), Err(TelemetryError::Decode(_))),
                "line {:?} should not decode",
                line
            );
        }
    }
}
