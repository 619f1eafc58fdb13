//! Cancellable status poll task.
//!
//! While a scan is running, one spawned task asks the backend for its
//! detection state on a fixed cadence and forwards every outcome over a
//! channel. The handle makes cancellation a single explicit call: after
//! `stop()` returns, no further poll fires.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::{BackendClient, DetectionStatus};

/// One outcome of a poll tick.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Status(DetectionStatus),
    /// The backend could not be reached or answered garbage. Polling
    /// continues; the UI gets to show it instead of stalling silently.
    Unreachable(String),
}

/// Handle to the running poll task.
pub struct StatusPoller {
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Spawn the poll loop. Events arrive on the returned receiver until
    /// the poller is stopped or the receiver is dropped.
    pub fn spawn(
        client: BackendClient,
        cadence: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(cadence);
            loop {
                ticker.tick().await;
                let event = match client.fetch_status().await {
                    Ok(status) => PollEvent::Status(status),
                    Err(e) => {
                        tracing::warn!("status poll failed: {}", e);
                        PollEvent::Unreachable(e.to_string())
                    }
                };
                if tx.send(event).is_err() {
                    // Receiver gone, nobody cares anymore
                    break;
                }
            }
        });

        (Self { handle }, rx)
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the poll task immediately.
    pub fn stop(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> BackendClient {
        // TEST-NET-1 address, nothing answers there; every poll reports
        // Unreachable, which is all these tests need
        BackendClient::new("http://192.0.2.1:1").unwrap()
    }

    #[tokio::test]
    async fn poller_reports_unreachable_backend() {
        let (poller, mut rx) =
            StatusPoller::spawn(unreachable_client(), Duration::from_millis(10));
        let event = rx.recv().await.expect("poller should emit an event");
        assert!(matches!(event, PollEvent::Unreachable(_)));
        poller.stop();
    }

    #[tokio::test]
    async fn stop_cancels_the_task() {
        let (poller, rx) =
            StatusPoller::spawn(unreachable_client(), Duration::from_millis(10));
        assert!(poller.is_active());

        let handle = poller.handle;
        handle.abort();
        let _ = handle.await;

        drop(rx);
    }

    #[tokio::test]
    async fn dropping_the_receiver_ends_the_loop() {
        let (poller, rx) =
            StatusPoller::spawn(unreachable_client(), Duration::from_millis(1));
        drop(rx);
        // The loop exits on its own once the send fails
        let _ = tokio::time::timeout(Duration::from_secs(5), poller.handle).await;
    }
}
