use tokio::sync::broadcast;

use skilltrade_types::events::SessionEvent;

/// Fans session events out to every subscribed view.
#[derive(Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<SessionEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Nobody listening is fine; events are advisory.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
