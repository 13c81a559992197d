// Emulates a phone sensor framework delivering accelerometer and gyroscope
// events at a fixed rate: a device lying flat and slowly rocking about z.

mod gaussian;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Notify;

use common::constants::STANDARD_GRAVITY;
use common::traits::{ReadingSink, ReadingSource};
use common::types::{Reading, SensorType, XYZ};

use crate::errors::TelemetryError;
use gaussian::GaussianNoise;

const NOISE_STDEV: f32 = 0.05;
const ROCKING_AMPLITUDE_RAD_S: f32 = 0.2;
const ROCKING_FREQUENCY_HZ: f32 = 0.5;

/// Configures synthetic data generation
pub struct MockSource {
    sensor_cluster_tag: String,
    sensor_cluster: Vec<SensorType>,
    noise: Option<GaussianNoise>,
    rng: Mutex<StdRng>,
}

impl MockSource {
    /// Creates a new `MockSource` for the given sensors, optionally adding Gaussian noise.
    pub fn new(
        sensor_cluster_tag: &str,
        sensor_cluster: Vec<SensorType>,
        add_sensor_noise: bool,
    ) -> Result<Self, TelemetryError> {
        let noise = if add_sensor_noise {
            Some(GaussianNoise::new(0.0, NOISE_STDEV)?)
        } else {
            None
        };
        Ok(Self {
            sensor_cluster_tag: sensor_cluster_tag.to_string(),
            sensor_cluster,
            noise,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Returns the reading `sensor_type` would deliver `elapsed_secs` after start.
    pub fn generate(&self, sensor_type: SensorType, elapsed_secs: f32) -> Reading {
        let phase = 2.0 * std::f32::consts::PI * ROCKING_FREQUENCY_HZ * elapsed_secs;
        let clean = match sensor_type {
            SensorType::Accelerometer => [0.0, 0.0, STANDARD_GRAVITY],
            SensorType::Gyroscope => [0.0, 0.0, ROCKING_AMPLITUDE_RAD_S * phase.sin()],
        };
        let values = match self.noise.as_ref() {
            Some(noise) => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                noise.add_noise(&mut rng, clean)
            }
            None => clean,
        };
        Reading::new(sensor_type, XYZ::new(values))
    }
}

#[async_trait]
impl ReadingSource for MockSource {
    /// Delivers one reading per sensor every `period` until `abort_signal` is notified.
    async fn start(
        &self,
        period: Duration,
        sink: Arc<dyn ReadingSink>,
        abort_signal: Arc<Notify>,
    ) -> Result<(), String> {
        if period.is_zero() {
            return Err("Sampling period must be non-zero".to_string());
        }
        log::info!(
            "Generating {} readings every {:?}...",
            self.sensor_cluster_tag,
            period
        );
        let start = Instant::now();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = abort_signal.notified() => {
                    break;
                }

                _ = interval.tick() => {
                    let elapsed_secs = start.elapsed().as_secs_f32();
                    for sensor_type in self.sensor_cluster.iter() {
                        sink.submit(self.generate(*sensor_type, elapsed_secs));
                    }
                }
            }
        }
        log::info!("Mock source {} stopped", self.sensor_cluster_tag);
        Ok(())
    }

    fn get_tag(&self) -> &str {
        self.sensor_cluster_tag.as_str()
    }

    fn get_sensor_cluster(&self) -> Vec<SensorType> {
        self.sensor_cluster.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Submission;

    #[derive(Default)]
    struct CollectingSink {
        readings: Mutex<Vec<Reading>>,
    }

    impl ReadingSink for CollectingSink {
        fn submit(&self, reading: Reading) -> Submission {
            self.readings.lock().unwrap().push(reading);
            Submission::Queued
        }
    }

    #[test]
    fn test_generate_without_noise() {
        let source = MockSource::new("Test", SensorType::ALL.to_vec(), false).unwrap();
        let acc = source.generate(SensorType::Accelerometer, 1.0);
        assert_eq!(acc.sensor_type(), SensorType::Accelerometer);
        assert_eq!(acc.measurement().inner(), [0.0, 0.0, STANDARD_GRAVITY]);

        let gyro = source.generate(SensorType::Gyroscope, 0.0);
        assert_eq!(gyro.sensor_type(), SensorType::Gyroscope);
        assert_eq!(gyro.measurement().inner(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_generate_with_noise_stays_close() {
        let source = MockSource::new("Test", SensorType::ALL.to_vec(), true).unwrap();
        for _ in 0..100 {
            let acc = source.generate(SensorType::Accelerometer, 0.0);
            let [x, y, z] = acc.measurement().inner();
            assert!(acc.measurement().is_finite());
            assert!(x.abs() < 1.0 && y.abs() < 1.0);
            assert!((z - STANDARD_GRAVITY).abs() < 1.0);
        }
    }

    #[test]
    fn test_tag_and_cluster() {
        let source = MockSource::new("Test", vec![SensorType::Gyroscope], false).unwrap();
        assert_eq!(source.get_tag(), "Test");
        assert_eq!(source.get_sensor_cluster(), vec![SensorType::Gyroscope]);
    }

    #[tokio::test]
    async fn test_start_delivers_until_aborted() {
        let source = Arc::new(MockSource::new("Test", SensorType::ALL.to_vec(), false).unwrap());
        let sink = Arc::new(CollectingSink::default());
        let abort_signal = Arc::new(Notify::new());

        let handle = tokio::spawn({
            let source = source.clone();
            let sink = sink.clone();
            let abort_signal = abort_signal.clone();
            async move {
                source
                    .start(Duration::from_millis(10), sink, abort_signal)
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        abort_signal.notify_one();
        handle.await.unwrap().unwrap();

        let readings = sink.readings.lock().unwrap();
        assert!(readings.len() >= 2);
        assert_eq!(readings[0].sensor_type(), SensorType::Accelerometer);
        assert_eq!(readings[1].sensor_type(), SensorType::Gyroscope);
    }

    #[tokio::test]
    async fn test_start_rejects_zero_period() {
        let source = MockSource::new("Test", SensorType::ALL.to_vec(), false).unwrap();
        let sink = Arc::new(CollectingSink::default());
        let result = source
            .start(Duration::ZERO, sink, Arc::new(Notify::new()))
            .await;
        assert!(result.is_err());
    }
}
