use std::{fmt, ops, sync::Arc};

use parking_lot::RwLockReadGuard;

/// A read guard for the current value of an observable list.
///
/// Note that as long as an `ObservableReadGuard` is kept alive, the associated
/// list is locked and can not be updated. In particular, writing to the list
/// from the thread that holds the guard deadlocks.
#[must_use]
#[clippy::has_significant_drop]
pub struct ObservableReadGuard<'a, T> {
    inner: RwLockReadGuard<'a, Arc<Vec<T>>>,
}

impl<'a, T> ObservableReadGuard<'a, T> {
    pub(crate) fn new(inner: RwLockReadGuard<'a, Arc<Vec<T>>>) -> Self {
        Self { inner }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> ops::Deref for ObservableReadGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.inner.as_slice()
    }
}
