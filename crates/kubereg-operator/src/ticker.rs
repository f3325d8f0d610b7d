//! Periodic sync trigger

use kubereg_core::KubeWork;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Enqueue a [`KubeWork::Sync`] every `period`, starting one period from now.
///
/// Stops on its own once the bookkeeper's queue is closed.
pub fn spawn_sync_ticker(
    period: Duration,
    work_tx: mpsc::UnboundedSender<KubeWork>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // Skip first immediate tick

        loop {
            interval.tick().await;
            if work_tx.send(KubeWork::Sync).is_err() {
                debug!("Work queue closed, stopping sync ticker");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_each_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_sync_ticker(Duration::from_secs(30), tx);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().unwrap(), KubeWork::Sync);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.try_recv().unwrap(), KubeWork::Sync);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_queue_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_sync_ticker(Duration::from_secs(1), tx);
        drop(rx);

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.await.unwrap();
    }
}
