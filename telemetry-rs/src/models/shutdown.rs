use log::{error, info};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

pub(crate) struct ShutdownSignal {
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    fn new(notify: Arc<Notify>) -> Self {
        Self { notify }
    }

    /// Waits for `run_for_millis` to elapse, or for Ctrl+C when no time-to-live is
    /// given, then notifies the stop signal.
    async fn listen_for_shutdown(&self, run_for_millis: Option<u64>) {
        match run_for_millis {
            Some(time_to_live_millis) => {
                tokio::time::sleep(std::time::Duration::from_millis(time_to_live_millis)).await;
                info!("Run time of {} ms elapsed. Sending stop signal...", time_to_live_millis);
            }
            None => loop {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl+C received. Sending stop signal...");
                        break;
                    }
                    Err(e) => {
                        error!("Error while waiting for Ctrl+C: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            },
        }
        // A stored permit reaches the source even if it is not waiting right now.
        self.notify.notify_one();
    }
}

pub(crate) fn listen_for_shutdown(
    notify: Arc<Notify>,
    run_for_millis: Option<u64>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let shutdown_signal = ShutdownSignal::new(notify);
        shutdown_signal.listen_for_shutdown(run_for_millis).await;
    })
}
