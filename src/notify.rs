use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for LISTEN/NOTIFY, keyed by channel name.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a channel. Creates the channel if needed.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish on the event's own channel. No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        if let Some(sender) = self.channels.get(event.channel()) {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BLOCKED_WINDOWS_CHANNEL, CATALOG_CHANNEL, RESERVATIONS_CHANNEL};
    use ulid::Ulid;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe(RESERVATIONS_CHANNEL);

        let event = Event::ReservationDeleted { id: Ulid::new() };
        hub.send(&event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn events_only_reach_their_channel() {
        let hub = NotifyHub::new();
        let mut windows = hub.subscribe(BLOCKED_WINDOWS_CHANNEL);
        let mut catalog = hub.subscribe(CATALOG_CHANNEL);

        hub.send(&Event::ItemDeleted { id: Ulid::new() });

        assert!(catalog.try_recv().is_ok());
        assert!(windows.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(&Event::WindowRemoved { id: Ulid::new() });
        let mut late = hub.subscribe(BLOCKED_WINDOWS_CHANNEL);
        assert!(late.try_recv().is_err());
    }
}
