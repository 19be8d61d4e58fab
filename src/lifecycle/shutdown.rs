//! One-shot stop signal shared by the API server and the maintenance worker.

use tokio::sync::broadcast;

/// Fans a single stop notice out to every subscribed task.
///
/// Dropping it without triggering closes the channel, which subscribers also
/// treat as a stop.
pub struct Shutdown {
    notice: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notice, _) = broadcast::channel(1);
        Self { notice }
    }

    /// A receiver that resolves once [`Shutdown::trigger`] runs.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notice.subscribe()
    }

    /// Tell every subscriber to stop. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        let listening = self.notice.send(()).unwrap_or(0);
        tracing::debug!(listening, "Shutdown triggered");
        listening
    }

    /// Subscribers that have not dropped their receiver yet.
    pub fn receiver_count(&self) -> usize {
        self.notice.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
