//! Line subscription registry.
//!
//! The registry holds `Weak` references only. An observer whose last `Arc` is
//! dropped stops receiving lines and its entry is pruned on the next dispatch
//! or unsubscribe. Identity is the allocation address, which a `Weak` keeps
//! reserved for as long as the entry exists, so a stale entry can never be
//! confused with a new observer.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::trace;

/// Receives every line read by a [`LineSource`](crate::source::LineSource).
pub trait LineObserver: Send + Sync {
    /// Handles one input line.
    fn notify(&self, line: &str);

    /// Called once when a read pass ends.
    fn end_of_stream(&self) {}
}

/// Subscription list with copy-on-read dispatch.
#[derive(Default)]
pub struct SubscriptionRegistry {
    observers: RwLock<Vec<Weak<dyn LineObserver>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` without taking ownership of it.
    ///
    /// Subscribing the same observer twice delivers every line to it twice.
    pub fn subscribe<O: LineObserver + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(observer);
        let weak: Weak<dyn LineObserver> = weak;
        self.write().push(weak);
        trace!(subscribers = self.len(), "observer subscribed");
    }

    /// Removes every entry for `observer`. Returns true if any was removed.
    pub fn unsubscribe<O: LineObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        self.remove(Arc::as_ptr(observer).cast())
    }

    /// Like [`unsubscribe`](Self::unsubscribe) for callers that only hold a
    /// `Weak`. Returns false if the observer has already been released.
    pub fn unsubscribe_weak<O: LineObserver + 'static>(&self, observer: &Weak<O>) -> bool {
        if observer.strong_count() == 0 {
            self.prune();
            return false;
        }
        self.remove(observer.as_ptr().cast())
    }

    /// Delivers `line` to every live observer in subscription order.
    ///
    /// Returns the number of deliveries made.
    pub fn dispatch(&self, line: &str) -> usize {
        self.for_each_live(|observer| observer.notify(line))
    }

    /// Signals end of a read pass to every live observer.
    pub fn end_of_stream(&self) -> usize {
        self.for_each_live(|observer| observer.end_of_stream())
    }

    /// Number of entries, including ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of entries whose observer is still alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.read().iter().filter(|w| w.strong_count() > 0).count()
    }

    fn for_each_live(&self, mut f: impl FnMut(&dyn LineObserver)) -> usize {
        // Observers run without the lock held so they may (un)subscribe.
        let snapshot = self.read().clone();

        let mut delivered = 0;
        let mut saw_dead = false;
        for weak in &snapshot {
            match weak.upgrade() {
                Some(observer) => {
                    f(observer.as_ref());
                    delivered += 1;
                }
                None => saw_dead = true,
            }
        }

        if saw_dead {
            self.prune();
        }
        delivered
    }

    fn remove(&self, target: *const ()) -> bool {
        let mut observers = self.write();
        let before = observers.len();
        let mut removed = false;
        observers.retain(|weak| {
            if weak.strong_count() == 0 {
                return false;
            }
            if weak.as_ptr().cast::<()>() == target {
                removed = true;
                return false;
            }
            true
        });
        trace!(removed, pruned = before - observers.len(), "unsubscribe");
        removed
    }

    fn prune(&self) {
        self.write().retain(|weak| weak.strong_count() > 0);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Weak<dyn LineObserver>>> {
        self.observers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Weak<dyn LineObserver>>> {
        self.observers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("entries", &self.len())
            .field("live", &self.live())
            .finish()
    }
}
