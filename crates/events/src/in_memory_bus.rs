//! Process-local event bus.

use std::sync::{mpsc, Mutex};

use crate::bus::{EventBus, Subscription};

/// The only way the in-memory bus can fail: a panicking thread poisoned the
/// subscriber registry lock.
#[derive(Debug)]
pub enum InMemoryBusError {
    Poisoned,
}

/// Channel-backed bus for tests, dev, and single-process deployments.
///
/// Every subscriber owns an unbounded channel and receives a copy of every
/// published message (broadcast). Subscribers whose receiver was dropped are
/// forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions, as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        let mut i = 0;
        while i < subs.len() {
            if subs[i].send(message.clone()).is_ok() {
                i += 1;
            } else {
                // Receiver hung up; forget the subscription.
                subs.swap_remove(i);
            }
        }

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // On a poisoned lock the subscription is still handed out; it simply
        // never receives anything, matching the failed publish side.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
