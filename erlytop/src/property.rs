//! Observable values: a current value plus change subscription.
//!
//! Backed by a `tokio::sync::watch` channel, so a subscriber always sees the
//! latest value and missed intermediate values are coalesced.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Property<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Property<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Store `value` and wake every subscriber, even if the value is unchanged.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
