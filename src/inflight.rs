//! Registry of cache keys with an outstanding remote resolution.
//!
//! The first caller for a key becomes the leader and receives a
//! [`FlightGuard`]; everyone else gets a [`FlightWaiter`] that resolves with
//! the leader's value. The key leaves the registry when the guard is dropped,
//! whatever the outcome.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cache::{CacheKey, TranslationStore};

#[derive(Default)]
pub struct InFlightRegistry {
    flights: Mutex<HashMap<CacheKey, watch::Receiver<Option<String>>>>,
}

pub enum Flight {
    Leader(FlightGuard),
    Follower(FlightWaiter),
}

static GLOBAL: OnceLock<Arc<InFlightRegistry>> = OnceLock::new();

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry paired with the global cache.
    pub fn global() -> Arc<InFlightRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(InFlightRegistry::new())))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.flights.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flights.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Join the flight for `key`, or start one.
    ///
    /// A new leader's key is marked pending in `store`.
    pub fn begin(self: &Arc<Self>, key: CacheKey, store: &Arc<dyn TranslationStore>) -> Flight {
        let mut flights = self.flights.lock();
        if let Some(rx) = flights.get(&key) {
            return Flight::Follower(FlightWaiter { rx: rx.clone() });
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(key.clone(), rx);
        drop(flights);

        store.mark_pending(&key);
        Flight::Leader(FlightGuard {
            key,
            tx,
            registry: Arc::clone(self),
            store: Arc::clone(store),
            completed: false,
        })
    }

    fn finish(&self, key: &CacheKey) {
        self.flights.lock().remove(key);
    }
}

/// Leadership of one in-flight key.
pub struct FlightGuard {
    key: CacheKey,
    tx: watch::Sender<Option<String>>,
    registry: Arc<InFlightRegistry>,
    store: Arc<dyn TranslationStore>,
    completed: bool,
}

impl FlightGuard {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Hand `value` to every waiter and release the key.
    ///
    /// The value must already be in the store, so a caller arriving after the
    /// release sees a cache hit.
    pub fn complete(mut self, value: &str) {
        self.completed = true;
        self.tx.send_replace(Some(value.to_string()));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.key);
        if !self.completed {
            self.store.discard_pending(&self.key);
        }
    }
}

pub struct FlightWaiter {
    rx: watch::Receiver<Option<String>>,
}

impl FlightWaiter {
    /// The leader's value, or `None` if the leader gave up without one.
    pub async fn wait(mut self) -> Option<String> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}
