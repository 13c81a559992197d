use log::error;
use std::sync::Arc;
use tokio::sync::Notify;

use common::traits::{ReadingSink, ReadingSource};
use common::types::SensorType;

use crate::adapters::mock::MockSource;
use crate::config::TelemetryConfig;
use crate::connection::ConnectionManager;
use crate::errors::{Result, TelemetryError};
use crate::models::shutdown;
use crate::sender::TelemetrySender;

/// Generic telemetry service: a reading source streaming into the telemetry sender
pub struct TelemetryService<S>
where
    S: ReadingSource,
{
    source: S,
    sender: Arc<TelemetrySender>,
    config: TelemetryConfig,
    abort_signal: Arc<Notify>,
}

impl<S> TelemetryService<S>
where
    S: ReadingSource,
{
    /// Creates a new service streaming readings from `source` to the configured host.
    /// Returns a Config error if the configuration is invalid. Must be called within a
    /// tokio runtime since it spawns the sender's writer task.
    pub fn new(config: TelemetryConfig, source: S) -> Result<Self> {
        config.validate()?;
        let connection = ConnectionManager::from_config(&config);
        let sender = Arc::new(TelemetrySender::new(connection, config.queue_capacity));
        Ok(Self {
            source,
            sender,
            config,
            abort_signal: Arc::new(Notify::new()),
        })
    }

    /// Connects in the background and streams readings until Ctrl+C, `stop`, or
    /// until `run_for_millis` elapsed. Readings produced before the connection is up
    /// are dropped. The connection is torn down on return.
    pub async fn start(&self, run_for_millis: Option<u64>) -> Result<()> {
        let _connect = self
            .sender
            .connection()
            .connect(&self.config.host, self.config.port)?;

        let listener = shutdown::listen_for_shutdown(Arc::clone(&self.abort_signal), run_for_millis);
        let sink: Arc<dyn ReadingSink> = self.sender.clone();
        let result = self
            .source
            .start(self.config.sample_period(), sink, Arc::clone(&self.abort_signal))
            .await;

        listener.abort();
        self.sender.shutdown().await;
        result.map_err(TelemetryError::Other)
    }

    /// Asks a running service to stop.
    pub fn stop(&self) {
        self.abort_signal.notify_one();
    }

    pub fn sender(&self) -> &Arc<TelemetrySender> {
        &self.sender
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn get_tag(&self) -> &str {
        self.source.get_tag()
    }

    pub fn get_sensor_cluster(&self) -> Vec<SensorType> {
        self.source.get_sensor_cluster()
    }
}

/// Starts the telemetry service asynchronously with the given reading source.
///
/// Returns a tuple containing:
/// * A `tokio::task::JoinHandle<()>` representing the spawned asynchronous task.
/// * An `Arc<TelemetryService<S>>` instance, allowing further interaction with the service.
///
/// A Config error is returned if the configuration is invalid.
pub fn run_service<S>(
    config: TelemetryConfig,
    source: S,
    run_for_millis: Option<u64>,
) -> Result<(tokio::task::JoinHandle<()>, Arc<TelemetryService<S>>)>
where
    S: ReadingSource + 'static,
{
    let service = Arc::new(TelemetryService::new(config, source)?);

    let handle = tokio::spawn({
        let service_clone = service.clone();
        async move {
            if let Err(e) = service_clone.start(run_for_millis).await {
                error!("Error in telemetry loop: {}", e);
            }
        }
    });
    Ok((handle, service))
}

/// Starts a telemetry service streaming synthetic accelerometer and gyroscope readings.
///
/// Returns a tuple containing:
/// - A `tokio::task::JoinHandle<()>` representing the spawned asynchronous task.
/// - An `Arc<TelemetryService<MockSource>>` instance, allowing further interaction with the service.
pub fn run_mock_service(
    config: TelemetryConfig,
    add_sensor_noise: bool,
    run_for_millis: Option<u64>,
) -> Result<(
    tokio::task::JoinHandle<()>,
    Arc<TelemetryService<MockSource>>,
)> {
    let source = MockSource::new("Mock", SensorType::ALL.to_vec(), add_sensor_noise)?;
    run_service(config, source, run_for_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn closed_config() -> TelemetryConfig {
        TelemetryConfig {
            sample_period_ms: 10,
            connect_timeout_ms: 200,
            ..TelemetryConfig::new("127.0.0.1", 1)
        }
    }

    #[tokio::test]
    async fn test_service_new_rejects_invalid_config() {
        let source = MockSource::new("Test", SensorType::ALL.to_vec(), false).unwrap();
        let config = TelemetryConfig::new("", 5010);
        assert!(matches!(
            TelemetryService::new(config, source),
            Err(TelemetryError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_service_accessors() {
        let source = MockSource::new("Test", vec![SensorType::Gyroscope], false).unwrap();
        let service = TelemetryService::new(TelemetryConfig::default(), source).unwrap();
        assert_eq!(service.get_tag(), "Test");
        assert_eq!(service.get_sensor_cluster(), vec![SensorType::Gyroscope]);
        assert_eq!(service.config().port, 5010);
    }

    #[tokio::test]
    async fn test_run_mock_service_without_server_drops_everything() {
        let (handle, service) = run_mock_service(closed_config(), false, Some(200)).unwrap();
        handle.await.unwrap();

        let stats = service.sender().stats();
        assert!(stats.dropped > 0);
        assert_eq!(stats.sent, 0);
        assert!(service.sender().is_closed());
    }

    #[tokio::test]
    async fn test_stop_ends_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = TelemetryConfig {
            sample_period_ms: 10,
            ..TelemetryConfig::new("127.0.0.1", port)
        };
        let (handle, service) = run_mock_service(config, true, None).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        service.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("service did not stop")
            .unwrap();
        assert!(service.sender().is_closed());
    }
}
