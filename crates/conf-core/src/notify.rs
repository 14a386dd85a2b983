//! In-process pub/sub for state-change events
//!
//! Delivery is synchronous and in registration order, so a test can
//! subscribe a recorder and assert exactly which events an operation
//! produced, in which order.

use std::sync::Mutex;

/// Something observable changed in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    BlocksChanged,
    GroupsChanged,
    IocsChanged,
    ComponentsChanged,
    ActiveChanged,
    CatalogChanged,
    StatusChanged,
}

type Subscriber = Box<dyn Fn(Event) + Send + Sync>;

/// Registration-ordered synchronous event fan-out.
#[derive(Default)]
pub struct Notifier {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; it will see every later event, after all
    /// subscribers registered before it.
    pub fn subscribe(&self, subscriber: impl Fn(Event) + Send + Sync + 'static) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(subscriber));
    }

    /// Deliver `event` to every subscriber before returning.
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for subscriber in subscribers.iter() {
            subscriber(event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        f.debug_struct("Notifier").field("subscribers", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn delivery_follows_registration_order() {
        let notifier = Notifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            notifier.subscribe(move |event| {
                log.lock().unwrap().push((tag, event));
            });
        }

        notifier.publish(Event::BlocksChanged);
        notifier.publish(Event::CatalogChanged);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("first", Event::BlocksChanged),
                ("second", Event::BlocksChanged),
                ("third", Event::BlocksChanged),
                ("first", Event::CatalogChanged),
                ("second", Event::CatalogChanged),
                ("third", Event::CatalogChanged),
            ]
        );
    }
}
