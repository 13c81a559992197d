use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock arrival time of a reading, in seconds since the UNIX epoch.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
pub struct Clock(f64);

impl Clock {
    pub fn now() -> Self {
        // A clock set before 1970 is reported as the epoch itself.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let timestamp = now.as_secs() as f64 + now.subsec_micros() as f64 * 1e-6;
        Self(timestamp)
    }

    pub fn from_secs(timestamp: f64) -> Self {
        Self(timestamp)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}
