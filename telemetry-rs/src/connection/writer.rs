use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use crate::codec::LINE_TERMINATOR;
use crate::errors::{Result, TelemetryError};

/// Write endpoint of an established connection.
///
/// Clones share the same socket. Writes are serialized by an async mutex, and a
/// closed flag set by teardown makes pending and later writes fail with
/// `TeardownRace` instead of hanging on a closed socket.
#[derive(Clone, Debug)]
pub struct ConnectionWriter {
    stream: Arc<Mutex<Option<TcpStream>>>,
    closer: Arc<watch::Sender<bool>>,
    closed: watch::Receiver<bool>,
    write_timeout: Duration,
    peer: Option<SocketAddr>,
}

impl ConnectionWriter {
    pub(crate) fn new(stream: TcpStream, write_timeout: Duration) -> Self {
        let peer = stream.peer_addr().ok();
        let (closer, closed) = watch::channel(false);
        Self {
            stream: Arc::new(Mutex::new(Some(stream))),
            closer: Arc::new(closer),
            closed,
            write_timeout,
            peer,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Returns true if both handles write to the same socket.
    pub fn same_endpoint(&self, other: &ConnectionWriter) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }

    /// Writes `line` followed by the line terminator and flushes the socket.
    ///
    /// # Errors
    /// - TeardownRace if the endpoint is, or becomes, closed
    /// - WriteFailure on I/O errors or when the write takes longer than the write timeout
    pub async fn write_line(&self, line: &str) -> Result<()> {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let mut buffer = Vec::with_capacity(line.len() + 1);
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(LINE_TERMINATOR as u8);

        let mut closed = self.closed.clone();
        tokio::select! {
            result = tokio::time::timeout(self.write_timeout, self.write_all(&buffer)) => {
                match result {
                    Ok(result) => result,
                    Err(_) => Err(TelemetryError::WriteFailure(format!(
                        "write timed out after {:?}",
                        self.write_timeout
                    ))),
                }
            }
            _ = closed.wait_for(|is_closed| *is_closed) => Err(self.closed_error()),
        }
    }

    async fn write_all(&self, buffer: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| self.closed_error())?;
        let written = match stream.write_all(buffer).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            if self.is_closed() {
                self.closed_error()
            } else {
                TelemetryError::WriteFailure(e.to_string())
            }
        })
    }

    /// Marks the endpoint closed, interrupting in-flight writes, and shuts down the socket.
    /// Closing an already closed endpoint does nothing.
    pub async fn close(&self) {
        self.closer.send_replace(true);
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            if let Err(e) = stream.shutdown().await {
                log::debug!("Error shutting down TCP stream: {}", e);
            }
        }
    }

    fn closed_error(&self) -> TelemetryError {
        TelemetryError::TeardownRace(match self.peer {
            Some(peer) => format!("connection to {} is closed", peer),
            None => "connection is closed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (ConnectionWriter, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (
            ConnectionWriter::new(client, Duration::from_millis(500)),
            server,
        )
    }

    #[tokio::test]
    async fn test_write_line_appends_terminator() {
        let (writer, mut server) = connected_pair().await;
        writer.write_line("{\"ax\":1.0}").await.unwrap();
        writer.close().await;

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "{\"ax\":1.0}\n");
    }

    #[tokio::test]
    async fn test_write_after_close_is_teardown_race() {
        let (writer, _server) = connected_pair().await;
        writer.close().await;
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_line("x").await,
            Err(TelemetryError::TeardownRace(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_shared_by_clones() {
        let (writer, _server) = connected_pair().await;
        let clone = writer.clone();
        writer.close().await;
        writer.close().await;
        assert!(clone.is_closed());
        assert!(clone.write_line("x").await.is_err());
    }

    #[tokio::test]
    async fn test_same_endpoint() {
        let (writer, _server) = connected_pair().await;
        let (other, _other_server) = connected_pair().await;
        assert!(writer.same_endpoint(&writer.clone()));
        assert!(!writer.same_endpoint(&other));
    }

    #[tokio::test]
    async fn test_write_timeout_is_write_failure() {
        let (writer, _server) = connected_pair().await;
        let writer = ConnectionWriter {
            write_timeout: Duration::from_millis(5),
            ..writer
        };
        // The peer never reads, so the send buffers fill up and a write stalls.
        let line = "x".repeat(64 * 1024);
        let mut result = Ok(());
        for _ in 0..10_000 {
            result = writer.write_line(&line).await;
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(TelemetryError::WriteFailure(_))));
        assert!(!writer.is_closed());
    }

    #[tokio::test]
    async fn test_peer_addr() {
        let (writer, server) = connected_pair().await;
        assert_eq!(writer.peer_addr(), Some(server.local_addr().unwrap()));
    }
}
