//! Per-address subscription to registry events.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{RegistryEvent, RegistryEvents, SubscriptionId};

/// Notifies the holder when the registry emits an event for one address.
///
/// Events are forwarded through an unbounded channel, so the feed's callback
/// never blocks. The subscription is removed on [`VerificationWatch::unsubscribe`]
/// or on drop.
pub struct VerificationWatch {
    events: Arc<dyn RegistryEvents>,
    id: Option<SubscriptionId>,
    address: String,
    receiver: mpsc::UnboundedReceiver<RegistryEvent>,
}

impl VerificationWatch {
    /// Subscribes to `events`, keeping only events concerning `address`.
    #[must_use]
    pub fn subscribe(events: Arc<dyn RegistryEvents>, address: &str) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let filter = address.to_string();
        let id = events.subscribe(Box::new(move |event: &RegistryEvent| {
            if event.concerns(&filter) {
                // The receiver is gone once the watch is dropped.
                let _ = sender.send(event.clone());
            }
        }));
        log::debug!("watching registry events for {address}");
        Self {
            events,
            id: Some(id),
            address: address.to_string(),
            receiver,
        }
    }

    /// The watched address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Waits for the next relevant event.
    ///
    /// Returns `None` once unsubscribed and drained.
    pub async fn changed(&mut self) -> Option<RegistryEvent> {
        self.receiver.recv().await
    }

    /// Returns a pending event without waiting.
    pub fn try_changed(&mut self) -> Option<RegistryEvent> {
        self.receiver.try_recv().ok()
    }

    /// Removes the subscription. Already delivered events can still be drained.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            self.events.unsubscribe(id);
            self.receiver.close();
        }
    }
}

impl Drop for VerificationWatch {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for VerificationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationWatch")
            .field("address", &self.address)
            .field("subscribed", &self.id.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClaimKind, EventHub, MemoryRegistry, RegistryEventKind};

    const HOLDER: &str = "0x00000000000000000000000000000000000000aa";
    const OTHER: &str = "0x00000000000000000000000000000000000000bb";

    #[tokio::test]
    async fn test_filters_by_address() {
        let registry = MemoryRegistry::new(1);
        let mut watch = VerificationWatch::subscribe(registry.events(), HOLDER);

        registry.verify_claim(OTHER, ClaimKind::Age);
        registry.verify_claim(&HOLDER.to_ascii_uppercase().replace("0X", "0x"), ClaimKind::Student);

        let event = watch.changed().await.expect("event");
        assert_eq!(event.kind, RegistryEventKind::ClaimVerified);
        assert_eq!(event.claim, Some(ClaimKind::Student));
        assert!(watch.try_changed().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = Arc::new(EventHub::new());
        let watch = VerificationWatch::subscribe(hub.clone(), HOLDER);
        assert_eq!(hub.subscriber_count(), 1);
        drop(watch);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_explicit_unsubscribe_is_idempotent() {
        let hub = Arc::new(EventHub::new());
        let mut watch = VerificationWatch::subscribe(hub.clone(), HOLDER);
        watch.unsubscribe();
        watch.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
        assert!(watch.try_changed().is_none());
    }
}
