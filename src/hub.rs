use tokio::sync::mpsc;
use tracing::debug;

use crate::events::{CompletionHook, FrameCallback, FrameEvent, StopReason};

/// Capacity of each subscriber's queue. Emission never waits on a
/// subscriber; a full queue drops that event for that subscriber only.
const SUBSCRIBER_QUEUE: usize = 32;

/// Fan-out point for frame emissions: a continuous push channel with any
/// number of subscribers, one per-start callback slot, and one completion
/// hook slot. Holds no playback state of its own.
#[derive(Default)]
pub struct NotificationHub {
    subscribers: Vec<mpsc::Sender<FrameEvent>>,
    on_frame: Option<FrameCallback>,
    on_complete: Option<CompletionHook>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a continuous subscriber. Frames are delivered in temporal
    /// order; subscriber lifetime is independent of the flipbook's — a
    /// dropped receiver is pruned on the next emission.
    pub fn subscribe(&mut self) -> mpsc::Receiver<FrameEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        self.subscribers.push(tx);
        rx
    }

    /// Installs the per-start callback, replacing any previous one.
    pub fn set_frame_callback(&mut self, callback: Option<FrameCallback>) {
        self.on_frame = callback;
    }

    pub fn clear_frame_callback(&mut self) {
        self.on_frame = None;
    }

    /// Installs the completion hook, replacing any previous one.
    pub fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.on_complete = Some(hook);
    }

    /// Pushes an emission to every live subscriber and, when requested, the
    /// per-start callback. Scrubbing emits with `to_callback = false`: no
    /// start is in effect, so only the continuous channel sees the frame.
    pub fn emit(&mut self, event: FrameEvent, to_callback: bool) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(index = event.index, "subscriber queue full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if to_callback {
            if let Some(cb) = self.on_frame.as_mut() {
                cb(event);
            }
        }
    }

    pub fn notify_complete(&mut self, reason: StopReason) {
        if let Some(hook) = self.on_complete.as_mut() {
            hook(reason);
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Frame;
    use std::sync::Arc;
    use std::time::Duration;

    fn event(index: usize) -> FrameEvent {
        FrameEvent {
            frame: Frame::new(Arc::new(image::RgbaImage::new(1, 1)), Duration::ZERO),
            index,
            count: 4,
        }
    }

    #[tokio::test]
    async fn delivers_in_order_to_each_subscriber() {
        let mut hub = NotificationHub::new();
        let mut rx_a = hub.subscribe();
        let mut rx_b = hub.subscribe();

        hub.emit(event(0), false);
        hub.emit(event(1), false);

        assert_eq!(rx_a.recv().await.unwrap().index, 0);
        assert_eq!(rx_a.recv().await.unwrap().index, 1);
        assert_eq!(rx_b.recv().await.unwrap().index, 0);
        assert_eq!(rx_b.recv().await.unwrap().index, 1);
    }

    #[tokio::test]
    async fn prunes_dropped_subscribers() {
        let mut hub = NotificationHub::new();
        let rx = hub.subscribe();
        drop(rx);
        let mut live = hub.subscribe();

        hub.emit(event(0), false);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(live.recv().await.unwrap().index, 0);
    }

    #[tokio::test]
    async fn callback_only_fires_when_requested() {
        let mut hub = NotificationHub::new();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = seen.clone();
        hub.set_frame_callback(Some(Box::new(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })));

        hub.emit(event(0), false);
        hub.emit(event(1), true);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);

        hub.clear_frame_callback();
        hub.emit(event(2), true);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
