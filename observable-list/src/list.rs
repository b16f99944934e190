use std::{fmt, sync::Arc};

use crate::{state::ObservableState, ListReader, ObservableReadGuard, Subscription, Updates};

/// An ordered list of values whose changes are broadcast to subscribers.
///
/// `ObservableList` can be `Clone`d; all clones share the same value and the
/// same subscribers. Every write notifies every subscriber synchronously,
/// before the write returns, in the order the subscribers were registered.
///
/// When the last clone is dropped, all subscribers are dropped as well (see
/// [`Subscription::detach`]) and streams returned by
/// [`subscribe_stream`][Self::subscribe_stream] end.
pub struct ObservableList<T> {
    state: Arc<ObservableState<T>>,
    /// Shared by all clones of this list, *excluding readers and streams*.
    _close_on_drop: Arc<CloseOnDrop<T>>,
}

/// Closes the state when dropped.
struct CloseOnDrop<T>(Arc<ObservableState<T>>);

impl<T> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl<T> ObservableList<T> {
    /// Create a new `ObservableList` with the given initial value.
    pub fn new(values: Vec<T>) -> Self {
        let state = Arc::new(ObservableState::new(values));
        Self { _close_on_drop: Arc::new(CloseOnDrop(Arc::clone(&state))), state }
    }

    /// Obtain a read-only view of this list.
    ///
    /// The reader doesn't keep the list open: once the last `ObservableList`
    /// handle is gone, it still sees the final value but subscribing through
    /// it only yields that value once.
    pub fn reader(&self) -> ListReader<T> {
        ListReader::new(Arc::clone(&self.state))
    }

    /// Register a callback that is called with the current value right away,
    /// and with the new value after every update.
    ///
    /// The callback is called synchronously, before `subscribe` returns and
    /// before every write method returns. It may read from or write to this
    /// list. A write from inside a callback takes effect immediately, and is
    /// delivered to subscribers once the current round of notifications is
    /// complete, so every subscriber sees every value in order.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or [`unsubscribe`][Subscription::unsubscribe]d.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        Subscription::register(&self.state, Arc::new(callback), false)
    }

    /// Obtain a stream of this list's values.
    ///
    /// The stream yields the current value first, then every update.
    pub fn subscribe_stream(&self) -> Updates<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Updates::new(&self.state)
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.read().to_vec()
    }

    /// Read the current value.
    ///
    /// While the returned read guard is alive, nobody can update the list. If
    /// you want to set a new value based on the current one, do **not** use
    /// this method, call [`update`][Self::update] instead.
    pub fn read(&self) -> ObservableReadGuard<'_, T> {
        ObservableReadGuard::new(self.state.read())
    }

    /// Get the number of values in the list.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Whether the list contains no values.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Replace the value and notify subscribers.
    ///
    /// Subscribers are notified even if the new value is equal to the previous
    /// one. Use [`set_eq`][Self::set_eq] to skip notifying in that case.
    pub fn set(&self, values: Vec<T>) {
        self.state.set(values);
    }

    /// Replace the value and notify subscribers if it doesn't compare equal to
    /// the current value.
    ///
    /// Returns whether the value was replaced.
    pub fn set_eq(&self, values: Vec<T>) -> bool
    where
        T: PartialEq,
    {
        self.state.set_eq(values)
    }

    /// Replace the value, notify subscribers and return the previous value.
    pub fn replace(&self, values: Vec<T>) -> Vec<T>
    where
        T: Clone,
    {
        Arc::unwrap_or_clone(self.state.set(values))
    }

    /// Empty the list, notify subscribers and return the previous value.
    ///
    /// Shorthand for `list.replace(Vec::new())`.
    pub fn take(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.replace(Vec::new())
    }

    /// Compute a new value from the current one, set it and notify
    /// subscribers.
    ///
    /// `f` always receives the latest value, also when called from within a
    /// subscriber callback. `list.update(f)` behaves like
    /// `list.set(f(&list.get()))`, except that no other thread can write in
    /// between.
    pub fn update(&self, f: impl FnOnce(&[T]) -> Vec<T>) {
        self.state.update(f);
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// Note that even if the value is not actually changed by the closure,
    /// subscribers will be notified as if it was. Use
    /// [`update_if`][Self::update_if] if you want to conditionally mutate the
    /// value.
    ///
    /// The list is locked while `f` runs, so `f` must not access it.
    pub fn update_in_place(&self, f: impl FnOnce(&mut Vec<T>))
    where
        T: Clone,
    {
        self.state.update_if(|values| {
            f(values);
            true
        });
    }

    /// Maybe mutate the value in place and notify subscribers if it changed.
    ///
    /// The closure given to this function must return `true` if subscribers
    /// should be notified of a change to the value. Returns what the closure
    /// returned.
    ///
    /// The list is locked while `f` runs, so `f` must not access it.
    pub fn update_if(&self, f: impl FnOnce(&mut Vec<T>) -> bool) -> bool
    where
        T: Clone,
    {
        self.state.update_if(f)
    }

    /// Get the number of registered subscribers.
    ///
    /// Streams count as subscribers, as do detached subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.subscriber_count()
    }
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone(), _close_on_drop: self._close_on_drop.clone() }
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> From<Vec<T>> for ObservableList<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl<T> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList").field("state", &self.state).finish()
    }
}
