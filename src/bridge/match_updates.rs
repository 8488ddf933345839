use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, warn};

use crate::model::MatchPatch;

type Listener = Arc<dyn Fn(&MatchPatch) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Hot pub/sub of match patches for surfaces that do not watch the store.
///
/// There is no replay: a listener only sees patches emitted after it subscribed.
#[derive(Clone, Default)]
pub struct MatchUpdateBridge {
    listeners: Arc<Mutex<Listeners>>,
}

impl MatchUpdateBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `patch` to every listener in registration order.
    ///
    /// A panicking listener is logged and skipped; the remaining ones still run.
    pub fn emit(&self, patch: &MatchPatch) {
        // Snapshot so listeners may (un)subscribe while being called.
        let listeners: Vec<(u64, Listener)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone();
        debug!(match_id = %patch.id, listeners = listeners.len(), "emitting match update");
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(patch))).is_err() {
                warn!(listener = id, match_id = %patch.id, "match update listener panicked");
            }
        }
    }

    /// Register `listener`. Dropping (or calling `unsubscribe` on) the returned
    /// handle removes it again.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MatchPatch) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

impl std::fmt::Debug for MatchUpdateBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchUpdateBridge")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Disposer for a [`MatchUpdateBridge`] listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn listeners_run_in_registration_order() {
        let bridge = MatchUpdateBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let seen = seen.clone();
            bridge.subscribe(move |p| seen.lock().unwrap().push(format!("a:{}", p.id)))
        };
        let second = {
            let seen = seen.clone();
            bridge.subscribe(move |p| seen.lock().unwrap().push(format!("b:{}", p.id)))
        };

        bridge.emit(&MatchPatch::new("m1"));

        assert_eq!(*seen.lock().unwrap(), vec!["a:m1", "b:m1"]);
        drop((first, second));
    }

    #[test]
    fn unsubscribed_listener_receives_nothing() {
        let bridge = MatchUpdateBridge::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let calls = calls.clone();
            bridge.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        bridge.emit(&MatchPatch::new("m1"));
        subscription.unsubscribe();
        bridge.emit(&MatchPatch::new("m1"));
        bridge.emit(&MatchPatch::new("m2"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.listener_count(), 0);
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let bridge = MatchUpdateBridge::new();
        bridge.emit(&MatchPatch::new("m1"));

        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = {
            let calls = calls.clone();
            bridge.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let bridge = MatchUpdateBridge::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let _bad = bridge.subscribe(|_| panic!("listener failure"));
        let _good = {
            let calls = calls.clone();
            bridge.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        bridge.emit(&MatchPatch::new("m1"));
        bridge.emit(&MatchPatch::new("m1"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
