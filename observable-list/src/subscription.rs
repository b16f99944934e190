use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::state::{Callback, ObservableState};

#[cfg(doc)]
use crate::ObservableList;

/// A handle to a callback registered with [`ObservableList::subscribe`].
///
/// The subscription owns the callback; the list only keeps a weak reference
/// to it. Dropping the subscription unsubscribes, so keep it alive for as
/// long as you want to receive updates. Use [`detach`][Self::detach] if the
/// callback should instead stay registered for as long as the list exists.
#[must_use = "dropping a `Subscription` unsubscribes its callback"]
pub struct Subscription<T> {
    state: Weak<ObservableState<T>>,
    /// `None` once unsubscribed, or if the list was already closed when
    /// subscribing.
    id: Option<u64>,
    /// `None` if the registry owns the callback.
    callback: Option<Arc<Callback<T>>>,
}

impl<T> Subscription<T> {
    /// Register `callback` and call it with the current value before
    /// returning.
    ///
    /// If `owned` is `true`, the registry keeps the callback alive instead of
    /// the returned subscription.
    pub(crate) fn register(
        state: &Arc<ObservableState<T>>,
        callback: Arc<Callback<T>>,
        owned: bool,
    ) -> Self {
        // Held across registration and the initial call so that no write can
        // happen in between, which would make the new subscriber see the same
        // value twice.
        let _dispatch = state.dispatch();
        let id = state.register(&callback, owned);
        let this = Self {
            state: Arc::downgrade(state),
            id,
            callback: (!owned).then(|| Arc::clone(&callback)),
        };

        // If this panics, dropping `this` unregisters the callback again.
        let current = state.current();
        callback(current.as_slice());

        this
    }

    /// Stop receiving updates.
    ///
    /// Calling this more than once, or after the list has been dropped, does
    /// nothing. Calling it from within a notification pass doesn't affect
    /// that pass (the callback still receives the value being delivered), only
    /// later ones.
    pub fn unsubscribe(&mut self) {
        let Some(id) = self.id.take() else { return };
        if let Some(state) = self.state.upgrade() {
            state.unregister(id);
        }
        self.callback = None;
    }

    /// Whether the callback is still registered.
    ///
    /// Returns `false` after [`unsubscribe`][Self::unsubscribe] was called and
    /// after the last [`ObservableList`] handle was dropped.
    pub fn is_active(&self) -> bool {
        match (self.id, self.state.upgrade()) {
            (Some(id), Some(state)) => state.is_registered(id),
            _ => false,
        }
    }

    /// Keep the callback registered for as long as the list exists.
    ///
    /// After this, there is no way to unsubscribe the callback. It is dropped
    /// when the last [`ObservableList`] handle is dropped. Note that a callback
    /// which captures a clone of the list itself keeps the list alive forever.
    pub fn detach(mut self) {
        if let (Some(id), Some(state)) = (self.id.take(), self.state.upgrade()) {
            state.retain(id);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
