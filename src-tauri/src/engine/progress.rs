//! Single-producer/single-consumer progress stream for one scan.
//!
//! The stream ends with exactly one [`ScanEvent::Finished`]. `finish` consumes
//! the sender, so nothing can be emitted after the terminal event.

use tokio::sync::mpsc;
use tracing::debug;

use super::types::{ScanProgress, ScanStage};

/// Capacity used by the controller.
pub const PROGRESS_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    Progress(ScanProgress),
    Finished { ok: bool },
}

pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ProgressSender { tx, last: None },
        ProgressReceiver { rx, done: false },
    )
}

pub struct ProgressSender {
    tx: mpsc::Sender<ScanEvent>,
    last: Option<ScanProgress>,
}

impl ProgressSender {
    /// Emit a progress tuple. `current` is clamped to `total` and never moves
    /// backwards within a stage; events for a stage that already ended are
    /// dropped. Returns `false` once the consumer is gone.
    pub async fn emit(&mut self, stage: ScanStage, current: u32, total: u32) -> bool {
        let mut current = current.min(total);
        if let Some(last) = self.last {
            if last.stage == ScanStage::Following && stage == ScanStage::Followers {
                debug!("Dropping followers progress after following stage started");
                return !self.tx.is_closed();
            }
            if last.stage == stage && current < last.current {
                current = last.current.min(total);
            }
        }
        let event = ScanProgress { stage, current, total };
        self.last = Some(event);
        self.tx.send(ScanEvent::Progress(event)).await.is_ok()
    }

    pub fn last(&self) -> Option<ScanProgress> {
        self.last
    }

    pub async fn finish(self, ok: bool) {
        let _ = self.tx.send(ScanEvent::Finished { ok }).await;
    }
}

pub struct ProgressReceiver {
    rx: mpsc::Receiver<ScanEvent>,
    done: bool,
}

impl ProgressReceiver {
    /// Next event in emission order. Returns `None` after the terminal event,
    /// or if the sender was dropped without finishing.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(event @ ScanEvent::Finished { .. }) => {
                self.done = true;
                self.rx.close();
                Some(event)
            }
            Some(event) => Some(event),
            None => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order_and_end_with_terminal() {
        let (mut tx, mut rx) = progress_channel(8);
        tx.emit(ScanStage::Followers, 50, 120).await;
        tx.emit(ScanStage::Followers, 120, 120).await;
        tx.emit(ScanStage::Following, 10, 10).await;
        tx.finish(true).await;

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[0],
            ScanEvent::Progress(ScanProgress { stage: ScanStage::Followers, current: 50, total: 120 })
        );
        assert_eq!(seen[3], ScanEvent::Finished { ok: true });
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_current_is_clamped_and_monotonic() {
        let (mut tx, mut rx) = progress_channel(8);
        tx.emit(ScanStage::Followers, 80, 60).await;
        tx.emit(ScanStage::Followers, 30, 60).await;
        tx.finish(false).await;

        let first = rx.recv().await;
        let second = rx.recv().await;
        match (first, second) {
            (Some(ScanEvent::Progress(a)), Some(ScanEvent::Progress(b))) => {
                assert_eq!(a.current, 60);
                assert_eq!(b.current, 60);
                assert!(b.current <= b.total);
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert_eq!(rx.recv().await, Some(ScanEvent::Finished { ok: false }));
    }

    #[tokio::test]
    async fn test_stale_stage_is_dropped() {
        let (mut tx, mut rx) = progress_channel(8);
        tx.emit(ScanStage::Following, 5, 10).await;
        tx.emit(ScanStage::Followers, 99, 100).await;
        tx.finish(true).await;

        assert!(matches!(rx.recv().await, Some(ScanEvent::Progress(p)) if p.stage == ScanStage::Following));
        assert_eq!(rx.recv().await, Some(ScanEvent::Finished { ok: true }));
    }

    #[tokio::test]
    async fn test_dropped_sender_ends_stream() {
        let (tx, mut rx) = progress_channel(4);
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_emit_reports_closed_consumer() {
        let (mut tx, rx) = progress_channel(4);
        drop(rx);
        assert!(!tx.emit(ScanStage::Followers, 1, 2).await);
    }
}
