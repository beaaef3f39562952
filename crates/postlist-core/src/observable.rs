//! Observable single-value container
//!
//! A list store publishes its snapshot through an [`Observable`]. The store
//! only needs get/set/update/subscribe, so any push-based container can be
//! plugged in. [`WatchCell`] is the default: a `tokio::sync::watch` channel
//! for async consumers plus synchronous change callbacks.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;

/// Change callback registered with [`Observable::subscribe`]
pub type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A single value that notifies subscribers when it is replaced
pub trait Observable<T>: Send + Sync {
    /// The current value
    fn get(&self) -> T;

    /// Replace the value
    fn set(&self, value: T);

    /// Replace the value with `f(current)`, atomically
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T;

    /// Call `on_change` with the current value now and with every new value
    /// until the returned subscription is dropped
    fn subscribe(&self, on_change: Callback<T>) -> Subscription;
}

/// Handle for a registered callback; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving changes
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct Subscribers<T> {
    next_id: u64,
    callbacks: Vec<(u64, Arc<dyn Fn(&T) + Send + Sync>)>,
}

/// Default [`Observable`] backed by a watch channel
pub struct WatchCell<T> {
    tx: watch::Sender<T>,
    subscribers: Arc<Mutex<Subscribers<T>>>,
    /// Held from commit until every callback has seen the value, so
    /// callbacks observe commits in commit order
    publish: ReentrantMutex<()>,
}

impl<T> WatchCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            subscribers: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                callbacks: Vec::new(),
            })),
            publish: ReentrantMutex::new(()),
        }
    }

    /// A receiver that observes every value committed from now on
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().callbacks.len()
    }

    fn notify(&self, value: &T) {
        // Callbacks run outside the lock so they may (un)subscribe
        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T> Observable<T> for WatchCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    fn set(&self, value: T) {
        let _publish = self.publish.lock();
        self.tx.send_replace(value.clone());
        self.notify(&value);
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _publish = self.publish.lock();
        let mut committed = None;
        self.tx.send_modify(|current| {
            let next = f(current);
            *current = next.clone();
            committed = Some(next);
        });
        if let Some(value) = committed {
            self.notify(&value);
        }
    }

    fn subscribe(&self, on_change: Callback<T>) -> Subscription {
        let callback: Arc<dyn Fn(&T) + Send + Sync> = Arc::from(on_change);
        let _publish = self.publish.lock();
        let current = self.get();
        callback(&current);

        let id = {
            let mut subs = self.subscribers.lock();
            let id = subs.next_id;
            subs.next_id += 1;
            subs.callbacks.push((id, callback));
            id
        };

        let weak: Weak<Mutex<Subscribers<T>>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subs) = weak.upgrade() {
                subs.lock().callbacks.retain(|(cid, _)| *cid != id);
            }
        })
    }
}
