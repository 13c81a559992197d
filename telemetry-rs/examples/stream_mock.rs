use std::sync::Arc;

use telemetry_rs::services;
use telemetry_rs::{DeliveryEvent, Listener, TelemetryConfig};
use tokio::time::Duration;

// Streams synthetic accelerometer and gyroscope readings to TELEMETRY_HOST:TELEMETRY_PORT
// (127.0.0.1:5010 by default). Try it with `nc -lk 5010` on the receiving side.
#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match TelemetryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };

    let run_for_millis = 20_000;
    let add_sensor_noise = true;

    // Start mock telemetry service
    let (handle, service) =
        match services::run_mock_service(config, add_sensor_noise, Some(run_for_millis)) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Unable to start service: {}", e);
                return;
            }
        };

    let mut listener = Listener::new(|_id, event: Arc<DeliveryEvent>| {
        if let DeliveryEvent::Failed { error, .. } = event.as_ref() {
            log::warn!("Delivery failed: {}", error);
        }
    });
    service.sender().register_listener(&mut listener);

    let timeout_duration = Duration::from_millis(run_for_millis + 5_000);
    let _ = tokio::time::timeout(timeout_duration, handle).await;

    let stats = service.sender().stats();
    log::info!(
        "Done: {} sent, {} dropped, {} failed",
        stats.sent,
        stats.dropped,
        stats.failed
    );
}
