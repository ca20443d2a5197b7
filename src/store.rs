//! Shared state container
//!
//! A [`Store`] holds one immutable snapshot of some state and replaces it
//! through a single reducer-driven dispatch path. Observers read snapshots or
//! subscribe to changes through a `watch` channel, so nobody ever sees a
//! half-applied transition and nothing can mutate the state in place.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Pure state transition: `(current, event) -> next`
pub type Reducer<S, E> = fn(&S, E) -> S;

/// State container with a single dispatch path
pub struct Store<S, E> {
    reducer: Reducer<S, E>,
    tx: watch::Sender<Arc<S>>,
}

impl<S, E> Store<S, E> {
    /// Create a store from an initial state and its reducer
    #[must_use]
    pub fn new(initial: S, reducer: Reducer<S, E>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { reducer, tx }
    }

    /// Apply an event and return the resulting snapshot
    ///
    /// Dispatches are serialized: the reducer runs while the snapshot is
    /// locked, so concurrent dispatches apply one after the other.
    pub fn dispatch(&self, event: E) -> Arc<S> {
        let reducer = self.reducer;
        let mut next = None;
        self.tx.send_modify(|state| {
            let updated = Arc::new(reducer(state, event));
            next = Some(Arc::clone(&updated));
            *state = updated;
        });
        next.unwrap_or_else(|| self.state())
    }

    /// Current snapshot
    #[must_use]
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.tx.borrow())
    }

    /// Subscribe to snapshot changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<S>> {
        self.tx.subscribe()
    }

    /// Wait until the state satisfies `pred`, returning the matching snapshot
    pub async fn wait_for(&self, mut pred: impl FnMut(&S) -> bool) -> Arc<S> {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail here
        match rx.wait_for(|state| pred(state)).await {
            Ok(state) => Arc::clone(&state),
            Err(_) => self.state(),
        }
    }
}

impl<S: fmt::Debug, E> fmt::Debug for Store<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.tx.borrow())
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}
