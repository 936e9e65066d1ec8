//! Broadcast of the "authenticated" flag.
//!
//! Observers get the current value as soon as they subscribe and then every
//! published value, in publish order, until they unsubscribe or drop their
//! `Subscription`.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

pub struct SessionPublisher {
    current: bool,
    observers: Vec<UnboundedSender<bool>>,
}

impl SessionPublisher {
    pub fn new(initial: bool) -> Self {
        Self {
            current: initial,
            observers: Vec::new(),
        }
    }

    pub fn current(&self) -> bool {
        self.current
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail, we hold the receiver
        let _ = tx.send(self.current);
        self.observers.push(tx);
        Subscription { rx }
    }

    /// Record `value` as current and push it to every live observer.
    pub fn publish(&mut self, value: bool) {
        self.current = value;
        self.observers.retain(|tx| tx.send(value).is_ok());
        trace!(authenticated = value, observers = self.observers.len(), "Session state published");
    }

    /// Number of observers still subscribed as of the last publish
    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// Receiving end of a session-state subscription.
pub struct Subscription {
    rx: UnboundedReceiver<bool>,
}

impl Subscription {
    /// Wait for the next value. `None` once the publisher is gone.
    pub async fn next(&mut self) -> Option<bool> {
        self.rx.recv().await
    }

    /// Take the next value if one is already queued.
    pub fn try_next(&mut self) -> Option<bool> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<bool> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}
