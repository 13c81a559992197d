use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::TelemetryConfig;
use crate::connection::{ConnectionWriter, RetryPolicy};
use crate::errors::{Result, TelemetryError};

/// Lifecycle state of the managed connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Inner {
    state: ConnectionState,
    writer: Option<ConnectionWriter>,
    // Bumped by every connect and teardown; a connect task whose generation is
    // stale must not publish its socket.
    generation: u64,
}

/// Owns the single outbound TCP connection.
///
/// At most one connection is live at any time. Connecting runs on a background
/// task, so none of the methods wait on the network except `teardown`, which only
/// waits for the socket shutdown.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<Inner>>,
    connect_timeout: Duration,
    write_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ConnectionManager {
    pub fn new(connect_timeout: Duration, write_timeout: Duration, retry_policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                writer: None,
                generation: 0,
            })),
            connect_timeout,
            write_timeout,
            retry_policy,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(
            config.connect_timeout(),
            config.write_timeout(),
            config.retry_policy(),
        )
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Starts connecting to `host:port` in the background and returns the handle of
    /// the connect task, which resolves once the attempt (and any retries) finished.
    ///
    /// Returns AlreadyConnected without spawning anything if a connection is being
    /// established or is established. Must be called within a tokio runtime.
    pub fn connect(&self, host: &str, port: u16) -> Result<JoinHandle<Result<()>>> {
        let generation = {
            let mut inner = self.lock();
            if matches!(
                inner.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                return Err(TelemetryError::AlreadyConnected(format!(
                    "connection is {}",
                    inner.state
                )));
            }
            inner.state = ConnectionState::Connecting;
            inner.generation += 1;
            inner.generation
        };

        info!("Connecting to TCP server {}:{}...", host, port);
        let manager = self.clone();
        let host = host.to_string();
        Ok(tokio::spawn(async move {
            manager.run_connect(host, port, generation).await
        }))
    }

    /// Returns the write endpoint if connected.
    pub fn current_writer(&self) -> Option<ConnectionWriter> {
        let inner = self.lock();
        match inner.state {
            ConnectionState::Connected => inner.writer.clone(),
            _ => None,
        }
    }

    /// Closes the connection, whatever its state, and leaves the manager
    /// `Disconnected`. A connect still in progress is discarded when it completes.
    /// Calling it more than once is harmless.
    pub async fn teardown(&self) {
        let (previous, writer) = {
            let mut inner = self.lock();
            let previous = inner.state;
            inner.generation += 1;
            inner.state = ConnectionState::Disconnected;
            (previous, inner.writer.take())
        };

        if let Some(writer) = writer {
            writer.close().await;
            info!("TCP connection closed");
        } else if previous == ConnectionState::Connecting {
            info!("Pending TCP connection attempt cancelled");
        }
    }

    /// Drops a connection whose write failed, leaving the manager `Failed` so that a
    /// new `connect` is accepted.
    ///
    /// A failed write may have left part of a line on the socket, so the endpoint is
    /// closed rather than reused. Does nothing but close `writer` if it is no longer
    /// the published endpoint, e.g. after a teardown or a reconnect.
    pub async fn mark_failed(&self, writer: &ConnectionWriter) {
        let published = {
            let mut inner = self.lock();
            let is_current = inner.state == ConnectionState::Connected
                && inner
                    .writer
                    .as_ref()
                    .is_some_and(|current| current.same_endpoint(writer));
            if is_current {
                inner.generation += 1;
                inner.state = ConnectionState::Failed;
                inner.writer = None;
            }
            is_current
        };

        writer.close().await;
        if published {
            warn!("TCP connection dropped after a failed write");
        }
    }

    async fn run_connect(&self, host: String, port: u16, generation: u64) -> Result<()> {
        let mut attempt = 1;
        loop {
            let error = match tokio::time::timeout(
                self.connect_timeout,
                TcpStream::connect((host.as_str(), port)),
            )
            .await
            {
                Ok(Ok(stream)) => return self.publish(stream, generation).await,
                Ok(Err(e)) => TelemetryError::ConnectFailure(format!("{}:{}: {}", host, port, e)),
                Err(_) => TelemetryError::ConnectFailure(format!(
                    "{}:{}: timed out after {:?}",
                    host, port, self.connect_timeout
                )),
            };
            error!("Failed to connect to TCP server: {}", error);

            if !self.is_current(generation) {
                return Err(cancelled());
            }
            match self.retry_policy.delay_after(attempt) {
                Some(delay) => {
                    attempt += 1;
                    warn!(
                        "Retrying connection in {:?} (attempt {}/{})",
                        delay,
                        attempt,
                        self.retry_policy.max_attempts()
                    );
                    tokio::time::sleep(delay).await;
                    if !self.is_current(generation) {
                        return Err(cancelled());
                    }
                }
                None => {
                    let mut inner = self.lock();
                    if inner.generation == generation {
                        inner.state = ConnectionState::Failed;
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn publish(&self, stream: TcpStream, generation: u64) -> Result<()> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Unable to disable Nagle's algorithm: {}", e);
        }
        let writer = ConnectionWriter::new(stream, self.write_timeout);
        {
            let mut inner = self.lock();
            if inner.generation == generation && inner.state == ConnectionState::Connecting {
                inner.state = ConnectionState::Connected;
                inner.writer = Some(writer);
                info!("Connected to TCP server successfully");
                return Ok(());
            }
        }
        info!("Connection completed after teardown, discarding it");
        writer.close().await;
        Err(cancelled())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State stays consistent even if a holder panicked: every update is a single assignment.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("connect_timeout", &self.connect_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

fn cancelled() -> TelemetryError {
    TelemetryError::ConnectFailure("connection attempt cancelled by teardown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(
            Duration::from_millis(500),
            Duration::from_millis(500),
            RetryPolicy::none(),
        )
    }

    // Port that was just bound and released, so nothing listens on it.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let manager = manager();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_writer().is_none());
    }

    #[tokio::test]
    async fn test_connect_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();

        let handle = manager.connect("127.0.0.1", port).unwrap();
        assert!(matches!(
            manager.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ));
        handle.await.unwrap().unwrap();

        assert_eq!(manager.state(), ConnectionState::Connected);
        let writer = manager.current_writer().expect("writer should be published");
        writer.write_line("hello").await.unwrap();

        let (mut server, _) = listener.accept().await.unwrap();
        let mut buffer = [0u8; 6];
        server.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"hello\n");
    }

    #[tokio::test]
    async fn test_connect_refused_is_failed_without_retry() {
        let port = closed_port().await;
        let manager = manager();

        let result = manager.connect("127.0.0.1", port).unwrap().await.unwrap();
        assert!(matches!(result, Err(TelemetryError::ConnectFailure(_))));
        assert_eq!(manager.state(), ConnectionState::Failed);
        assert!(manager.current_writer().is_none());
    }

    #[tokio::test]
    async fn test_connect_can_be_repeated_after_failure() {
        let port = closed_port().await;
        let manager = manager();
        let _ = manager.connect("127.0.0.1", port).unwrap().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Failed);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_single_live_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();

        let handle = manager.connect("127.0.0.1", port).unwrap();
        assert!(matches!(
            manager.connect("127.0.0.1", port),
            Err(TelemetryError::AlreadyConnected(_))
        ));
        handle.await.unwrap().unwrap();
        assert!(matches!(
            manager.connect("127.0.0.1", port),
            Err(TelemetryError::AlreadyConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_teardown_closes_writer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();
        let writer = manager.current_writer().unwrap();

        manager.teardown().await;

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_writer().is_none());
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_line("late").await,
            Err(TelemetryError::TeardownRace(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_failed_allows_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();
        let writer = manager.current_writer().unwrap();

        manager.mark_failed(&writer).await;

        assert_eq!(manager.state(), ConnectionState::Failed);
        assert!(manager.current_writer().is_none());
        assert!(writer.is_closed());
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_mark_failed_ignores_stale_writer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();
        let stale = manager.current_writer().unwrap();
        manager.teardown().await;
        manager.connect("127.0.0.1", port).unwrap().await.unwrap().unwrap();

        manager.mark_failed(&stale).await;

        assert_eq!(manager.state(), ConnectionState::Connected);
        let current = manager.current_writer().unwrap();
        assert!(!current.is_closed());
        assert!(!current.same_endpoint(&stale));
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let manager = manager();
        manager.teardown().await;
        manager.teardown().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_teardown_discards_late_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let manager = manager();

        let handle = manager.connect("127.0.0.1", port).unwrap();
        manager.teardown().await;
        let result = handle.await.unwrap();

        assert!(result.is_err());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_writer().is_none());
    }

    #[tokio::test]
    async fn test_retry_policy_retries_until_exhausted() {
        let port = closed_port().await;
        let manager = ConnectionManager::new(
            Duration::from_millis(200),
            Duration::from_millis(200),
            RetryPolicy::exponential(2, Duration::from_millis(10), Duration::from_millis(20)),
        );

        let start = std::time::Instant::now();
        let result = manager.connect("127.0.0.1", port).unwrap().await.unwrap();
        assert!(result.is_err());
        // Two waits: 10ms then 20ms
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(manager.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_retry_reaches_late_server() {
        let port = closed_port().await;
        let manager = ConnectionManager::new(
            Duration::from_millis(200),
            Duration::from_millis(200),
            RetryPolicy::exponential(20, Duration::from_millis(20), Duration::from_millis(50)),
        );

        let handle = manager.connect("127.0.0.1", port).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();

        handle.await.unwrap().unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
    }
}
