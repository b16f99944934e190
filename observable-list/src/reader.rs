use std::{fmt, sync::Arc};

use crate::{state::ObservableState, ObservableReadGuard, Subscription, Updates};

#[cfg(doc)]
use crate::ObservableList;

/// A read-only view of an [`ObservableList`].
///
/// Obtained through [`ObservableList::reader`]. Hand this to consumers that
/// display the list but must not change it.
pub struct ListReader<T> {
    state: Arc<ObservableState<T>>,
}

impl<T> ListReader<T> {
    pub(crate) fn new(state: Arc<ObservableState<T>>) -> Self {
        Self { state }
    }

    /// Register a callback that is called with the current value right away,
    /// and with the new value after every update.
    ///
    /// See [`ObservableList::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        Subscription::register(&self.state, Arc::new(callback), false)
    }

    /// Obtain a stream of the list's values.
    ///
    /// See [`ObservableList::subscribe_stream`].
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
    /// While the returned read guard is alive, nobody can update the list.
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

    /// Whether every [`ObservableList`] handle has been dropped.
    ///
    /// A closed list can't be updated anymore and doesn't accept subscribers.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.subscriber_count()
    }
}

impl<T> Clone for ListReader<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T: fmt::Debug> fmt::Debug for ListReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListReader").field("state", &self.state).finish()
    }
}
