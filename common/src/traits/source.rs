use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::traits::ReadingSink;
use crate::types::SensorType;

/// Producer of sensor readings, e.g. the platform sensor framework or a mock.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Starts producing readings into `sink` every `period` until `abort_signal` is notified.
    /// Returns an error description if the source cannot be started.
    async fn start(
        &self,
        period: Duration,
        sink: Arc<dyn ReadingSink>,
        abort_signal: Arc<Notify>,
    ) -> Result<(), String>;

    fn get_tag(&self) -> &str;

    /// Sensors this source delivers readings for.
    fn get_sensor_cluster(&self) -> Vec<SensorType>;
}
