use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const POLL_PERIOD_MS: u64 = 10;

/// Listening TCP server that accepts any number of clients and appends all bytes
/// they send to a single buffer.
pub struct StubServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<u8>>>,
    connections: Arc<AtomicUsize>,
    clients: Arc<StdMutex<Vec<JoinHandle<()>>>>,
    accept_loop: JoinHandle<()>,
}

impl StubServer {
    /// Starts a server on an ephemeral loopback port.
    pub async fn start() -> io::Result<Self> {
        Self::bind("127.0.0.1:0").await
    }

    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let clients = Arc::new(StdMutex::new(Vec::new()));

        let accept_loop = tokio::spawn({
            let received = received.clone();
            let connections = connections.clone();
            let clients = clients.clone();
            async move {
                loop {
                    let (mut stream, peer) = match listener.accept().await {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            log::error!("Stub server accept failed: {}", e);
                            continue;
                        }
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    log::debug!("Stub server accepted {}", peer);
                    let received = received.clone();
                    let client = tokio::spawn(async move {
                        let mut buffer = [0u8; 1024];
                        loop {
                            match stream.read(&mut buffer).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => received.lock().await.extend_from_slice(&buffer[..n]),
                            }
                        }
                    });
                    clients.lock().unwrap().push(client);
                }
            }
        });

        Ok(Self {
            addr,
            received,
            connections,
            clients,
            accept_loop,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of clients accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn received(&self) -> Vec<u8> {
        self.received.lock().await.clone()
    }

    pub async fn received_string(&self) -> String {
        String::from_utf8_lossy(&self.received().await).into_owned()
    }

    /// Waits until at least `n` newline-terminated lines arrived or `timeout` elapsed,
    /// and returns the complete lines received so far.
    pub async fn wait_for_lines(&self, n: usize, timeout: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let lines = self.lines().await;
            if lines.len() >= n || tokio::time::Instant::now() >= deadline {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(POLL_PERIOD_MS)).await;
        }
    }

    /// Waits until at least one client connected or `timeout` elapsed.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.connections() == 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(POLL_PERIOD_MS)).await;
        }
        true
    }

    /// Closes every accepted client socket. The server keeps accepting new clients.
    pub fn disconnect_clients(&self) {
        for client in self.clients.lock().unwrap().drain(..) {
            client.abort();
        }
    }

    async fn lines(&self) -> Vec<String> {
        let received = self.received_string().await;
        let complete = match received.rfind('\n') {
            Some(idx) => &received[..idx],
            None => return Vec::new(),
        };
        complete.split('\n').map(str::to_string).collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
        self.disconnect_clients();
    }
}
