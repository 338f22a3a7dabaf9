use crate::types::ClientEvent;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Fan-out of client events to whatever hosts the UI (router, window, CLI).
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<ClientEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: ClientEvent) {
        tracing::info!(?event, redirect = event.redirect_path(), "client event");
        if self.tx.send(event).is_err() {
            tracing::debug!("client event dropped, nobody is subscribed");
        }
    }
}
