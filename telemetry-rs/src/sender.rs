//! Telemetry sender: turns readings into wire lines and delivers them over the
//! current connection without ever stalling the producer.
//!
//! `submit` only checks the connection state and pushes the reading onto a
//! bounded queue. A single writer task drains the queue in FIFO order, encodes
//! each reading and writes it to the connection, so readings submitted in order
//! reach the wire in order. Delivery is best-effort and at-most-once: a reading
//! that cannot be queued or written is logged, reported and forgotten. A failed
//! write drops the connection, which is left `Failed` until connected again.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use common::traits::ReadingSink;
use common::types::{DropReason, Reading, Submission};

use crate::codec;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::delivery::{DeliveryEvent, DeliveryReporter, DeliveryStats, Listener};
use crate::errors::TelemetryError;

pub struct TelemetrySender {
    queue: Mutex<Option<mpsc::Sender<Reading>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    connection: ConnectionManager,
    reporter: DeliveryReporter,
}

impl TelemetrySender {
    /// Creates a sender writing through `connection` and spawns its writer task.
    /// Must be called within a tokio runtime.
    pub fn new(connection: ConnectionManager, queue_capacity: usize) -> Self {
        Self::with_reporter(connection, queue_capacity, DeliveryReporter::new())
    }

    pub fn with_reporter(
        connection: ConnectionManager,
        queue_capacity: usize,
        reporter: DeliveryReporter,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let worker = tokio::spawn(run_writer(rx, connection.clone(), reporter.clone()));
        Self {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            connection,
            reporter,
        }
    }

    /// Hands a reading over for delivery and returns immediately.
    ///
    /// The reading is dropped, logged and reported when the sender is shut down,
    /// when no connection is established, or when the queue is full. Never blocks
    /// on the network and never fails.
    pub fn submit(&self, reading: Reading) -> Submission {
        let queue = lock(&self.queue);
        let Some(tx) = queue.as_ref() else {
            drop(queue);
            return self.drop_reading(reading, DropReason::Closed);
        };
        if self.connection.state() != ConnectionState::Connected {
            drop(queue);
            return self.drop_reading(reading, DropReason::NotConnected);
        }
        match tx.try_send(reading) {
            Ok(()) => Submission::Queued,
            Err(TrySendError::Full(reading)) => {
                drop(queue);
                self.drop_reading(reading, DropReason::QueueFull)
            }
            Err(TrySendError::Closed(reading)) => {
                drop(queue);
                self.drop_reading(reading, DropReason::Closed)
            }
        }
    }

    /// Stops accepting readings, waits for the queued ones to be handled and tears
    /// the connection down. Calling it again only repeats the teardown.
    pub async fn shutdown(&self) {
        let tx = lock(&self.queue).take();
        drop(tx);
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Telemetry writer task ended abnormally: {}", e);
            }
            let stats = self.stats();
            info!(
                "Telemetry sender stopped ({} sent, {} dropped, {} failed)",
                stats.sent, stats.dropped, stats.failed
            );
        }
        self.connection.teardown().await;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.queue).is_none()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn reporter(&self) -> &DeliveryReporter {
        &self.reporter
    }

    /// Registers a listener for the delivery outcome of every reading.
    ///
    /// Callbacks run synchronously on the thread that produced the outcome: `Sent`,
    /// `Failed` and late drops on the writer task, but drops decided by `submit` on
    /// the thread calling `submit`. A callback must therefore return quickly, or it
    /// delays the sensor producer.
    pub fn register_listener(&self, listener: &mut Listener<DeliveryEvent>) -> Uuid {
        self.reporter.register_listener(listener)
    }

    pub fn unregister_listener(&self, listener_id: Uuid) -> bool {
        self.reporter.unregister_listener(listener_id)
    }

    pub fn stats(&self) -> DeliveryStats {
        self.reporter.stats()
    }

    fn drop_reading(&self, reading: Reading, reason: DropReason) -> Submission {
        report_drop(&self.reporter, reading, reason);
        Submission::Dropped(reason)
    }
}

impl ReadingSink for TelemetrySender {
    fn submit(&self, reading: Reading) -> Submission {
        TelemetrySender::submit(self, reading)
    }
}

impl fmt::Debug for TelemetrySender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySender")
            .field("connection", &self.connection)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

async fn run_writer(
    mut rx: mpsc::Receiver<Reading>,
    connection: ConnectionManager,
    reporter: DeliveryReporter,
) {
    while let Some(reading) = rx.recv().await {
        deliver(&connection, &reporter, reading).await;
    }
    debug!("Telemetry writer task finished");
}

async fn deliver(connection: &ConnectionManager, reporter: &DeliveryReporter, reading: Reading) {
    let line = match codec::encode(&reading) {
        Ok(line) => line,
        Err(e) => {
            warn!("{}", e);
            report_drop(reporter, reading, DropReason::Unencodable);
            return;
        }
    };
    let Some(writer) = connection.current_writer() else {
        report_drop(reporter, reading, DropReason::NotConnected);
        return;
    };
    match writer.write_line(&line).await {
        Ok(()) => {
            debug!("Sent JSON to TCP server: {}", line);
            reporter.notify_listeners(DeliveryEvent::Sent { reading });
        }
        Err(error) => {
            error!("Failed to send JSON {}: {}", line, error);
            // A partial line may be on the wire; nothing else can follow it.
            if matches!(error, TelemetryError::WriteFailure(_)) {
                connection.mark_failed(&writer).await;
            }
            reporter.notify_listeners(DeliveryEvent::Failed { reading, error });
        }
    }
}

fn report_drop(reporter: &DeliveryReporter, reading: Reading, reason: DropReason) {
    warn!("Dropping {} reading: {}", reading.sensor_type(), reason);
    reporter.notify_listeners(DeliveryEvent::Dropped { reading, reason });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
