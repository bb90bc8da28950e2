use log::trace;
use std::fmt;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Persisted collection touched by a store write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tokens,
    Contacts,
    Transactions,
    Users,
    Notifications,
    Alerts,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Tokens => "tokens",
            Collection::Contacts => "contacts",
            Collection::Transactions => "transactions",
            Collection::Users => "users",
            Collection::Notifications => "notifications",
            Collection::Alerts => "alerts",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A rate poll replaced the rate table
    RatesUpdated,
    /// A store committed a write to the named collection
    StoreChanged(Collection),
    /// The active wallet store was replaced
    WalletSwitched(String),
}

/// Process-wide broadcast of sync and store events.
///
/// Consumers that want a live view subscribe and re-query on the events they care about.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: SyncEvent) {
        trace!("Publishing {:?}", event);
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(SyncEvent::RatesUpdated);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SyncEvent::StoreChanged(Collection::Tokens));
        bus.publish(SyncEvent::RatesUpdated);

        assert_eq!(rx.recv().await.unwrap(), SyncEvent::StoreChanged(Collection::Tokens));
        assert_eq!(rx.recv().await.unwrap(), SyncEvent::RatesUpdated);
    }
}
