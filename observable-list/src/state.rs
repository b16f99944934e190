use std::{
    any::Any,
    collections::{BTreeMap, VecDeque},
    fmt, mem,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Weak},
};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard};

/// The callback type stored for every subscriber.
pub(crate) type Callback<T> = dyn Fn(&[T]) + Send + Sync;

pub(crate) struct ObservableState<T> {
    /// The wrapped value.
    ///
    /// Kept behind an `Arc` so notification passes can hold on to the value
    /// they are delivering without keeping the lock.
    value: RwLock<Arc<Vec<T>>>,

    /// Subscribers and the deliveries that are waiting to be made.
    ///
    /// Never locked while a callback runs.
    registry: Mutex<Registry<T>>,

    /// Held by whoever writes the value or runs a notification pass.
    ///
    /// Reentrant so that callbacks on the dispatching thread can write to or
    /// subscribe to the same list, while writers on other threads wait until
    /// the pass is over.
    dispatch: ReentrantMutex<()>,
}

struct Registry<T> {
    /// Registered subscribers, keyed by a monotonically increasing id so that
    /// iteration order is registration order.
    subscribers: BTreeMap<u64, Slot<T>>,
    next_id: u64,

    /// Deliveries that have been scheduled but not yet made.
    ///
    /// A write from inside a callback appends to this queue instead of
    /// starting a nested pass.
    queue: VecDeque<Delivery<T>>,
    /// Number given to the next batch of deliveries scheduled together.
    next_pass: u64,

    /// Whether some stack frame is currently draining `queue`.
    draining: bool,

    /// Set once the last `ObservableList` handle is gone.
    closed: bool,
}

/// How the registry refers to a subscriber's callback.
enum Slot<T> {
    /// The callback is owned by a `Subscription`.
    Borrowed(Weak<Callback<T>>),
    /// The registry owns the callback (detached subscriptions, streams).
    Owned(Arc<Callback<T>>),
}

impl<T> Slot<T> {
    fn callback(&self) -> Option<Arc<Callback<T>>> {
        match self {
            Self::Borrowed(weak) => weak.upgrade(),
            Self::Owned(callback) => Some(Arc::clone(callback)),
        }
    }

    fn downgrade(&self) -> Weak<Callback<T>> {
        match self {
            Self::Borrowed(weak) => weak.clone(),
            Self::Owned(callback) => Arc::downgrade(callback),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Borrowed(weak) => weak.strong_count() > 0,
            Self::Owned(_) => true,
        }
    }
}

/// Callbacks to invoke in one notification pass, with the value to deliver.
type Pass<T> = Vec<(Arc<Callback<T>>, Arc<Vec<T>>)>;

/// A delivery waiting in the queue.
///
/// Only holds on to the callback weakly, the subscriber may go away before
/// its pass starts.
struct Delivery<T> {
    id: u64,
    pass: u64,
    callback: Weak<Callback<T>>,
    value: Arc<Vec<T>>,
}

impl<T> ObservableState<T> {
    pub(crate) fn new(value: Vec<T>) -> Self {
        Self {
            value: RwLock::new(Arc::new(value)),
            registry: Mutex::new(Registry {
                subscribers: BTreeMap::new(),
                next_id: 0,
                queue: VecDeque::new(),
                next_pass: 0,
                draining: false,
                closed: false,
            }),
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Lock the inner value for reading.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Arc<Vec<T>>> {
        self.value.read()
    }

    /// Get a handle to the current value without holding the lock.
    pub(crate) fn current(&self) -> Arc<Vec<T>> {
        Arc::clone(&*self.value.read())
    }

    /// Exclude other threads from writing or notifying.
    pub(crate) fn dispatch(&self) -> ReentrantMutexGuard<'_, ()> {
        self.dispatch.lock()
    }

    pub(crate) fn set(&self, value: Vec<T>) -> Arc<Vec<T>> {
        let _dispatch = self.dispatch.lock();
        let value = Arc::new(value);
        let previous = mem::replace(&mut *self.value.write(), Arc::clone(&value));
        self.notify(value);
        previous
    }

    pub(crate) fn set_eq(&self, value: Vec<T>) -> bool
    where
        T: PartialEq,
    {
        let _dispatch = self.dispatch.lock();
        if **self.value.read() == value {
            return false;
        }

        self.set(value);
        true
    }

    pub(crate) fn update(&self, f: impl FnOnce(&[T]) -> Vec<T>) {
        let _dispatch = self.dispatch.lock();
        // The read lock is released before calling `f`, which may read or
        // write this list itself.
        let current = self.current();
        let value = f(current.as_slice());
        drop(current);
        self.set(value);
    }

    pub(crate) fn update_if(&self, f: impl FnOnce(&mut Vec<T>) -> bool) -> bool
    where
        T: Clone,
    {
        let _dispatch = self.dispatch.lock();
        let value = {
            let mut guard = self.value.write();
            if !f(Arc::make_mut(&mut *guard)) {
                return false;
            }
            Arc::clone(&*guard)
        };

        self.notify(value);
        true
    }

    /// Add a subscriber to the registry.
    ///
    /// Returns `None` if the list has been closed, in which case nothing is
    /// registered.
    pub(crate) fn register(&self, callback: &Arc<Callback<T>>, owned: bool) -> Option<u64> {
        let mut registry = self.registry.lock();
        if registry.closed {
            return None;
        }

        let id = registry.next_id;
        registry.next_id += 1;
        let slot = if owned {
            Slot::Owned(Arc::clone(callback))
        } else {
            Slot::Borrowed(Arc::downgrade(callback))
        };
        registry.subscribers.insert(id, slot);

        #[cfg(feature = "tracing")]
        tracing::trace!(id, "Registered subscriber");

        Some(id)
    }

    /// Remove a subscriber from the registry.
    ///
    /// Returns whether the subscriber was still registered.
    pub(crate) fn unregister(&self, id: u64) -> bool {
        let removed = self.registry.lock().subscribers.remove(&id);

        #[cfg(feature = "tracing")]
        if removed.is_some() {
            tracing::trace!(id, "Unregistered subscriber");
        }

        // Dropped outside of the lock since it may own the callback, and with
        // it arbitrary values that could use this list in their destructor.
        removed.is_some()
    }

    /// Make the registry own the callback of the given subscriber.
    pub(crate) fn retain(&self, id: u64) {
        let mut registry = self.registry.lock();
        if let Some(slot) = registry.subscribers.get_mut(&id) {
            if let Some(callback) = slot.callback() {
                *slot = Slot::Owned(callback);
            }
        }
    }

    pub(crate) fn is_registered(&self, id: u64) -> bool {
        self.registry.lock().subscribers.get(&id).is_some_and(Slot::is_alive)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.values().filter(|slot| slot.is_alive()).count()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.registry.lock().closed
    }

    /// "Close" the state – drop all subscribers and refuse new ones.
    pub(crate) fn close(&self) {
        let subscribers = {
            let mut registry = self.registry.lock();
            registry.closed = true;
            mem::take(&mut registry.subscribers)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Closed with {} registered subscribers", subscribers.len());

        drop(subscribers);
    }

    /// Schedule delivery of `value` to every current subscriber and, unless a
    /// pass is already running further up the stack, deliver everything that
    /// is scheduled.
    ///
    /// Must be called with the dispatch lock held.
    fn notify(&self, value: Arc<Vec<T>>) {
        {
            let mut registry = self.registry.lock();
            registry.schedule(&value);
            if registry.draining {
                return;
            }
            registry.draining = true;
        }

        if let Some(payload) = self.drain() {
            panic::resume_unwind(payload);
        }
    }

    /// Make all scheduled deliveries, including the ones scheduled while
    /// draining, one pass at a time.
    ///
    /// A panicking subscriber doesn't prevent the others from being notified.
    /// The payload of the first panic is returned.
    fn drain(&self) -> Option<Box<dyn Any + Send>> {
        let mut first_panic = None;

        loop {
            let pass = {
                let mut registry = self.registry.lock();
                let pass = registry.start_pass();
                if pass.is_none() {
                    registry.draining = false;
                }
                pass
            };
            let Some(pass) = pass else { break };

            for (callback, value) in pass {
                let result = panic::catch_unwind(AssertUnwindSafe(|| callback(value.as_slice())));
                if let Err(payload) = result {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Subscriber panicked: {}", panic_message(&*payload));

                    first_panic.get_or_insert(payload);
                }
            }
        }

        first_panic
    }
}

impl<T> Registry<T> {
    fn schedule(&mut self, value: &Arc<Vec<T>>) {
        let pass = self.next_pass;
        self.next_pass += 1;

        let deliveries = self
            .subscribers
            .iter()
            .filter(|(_, slot)| slot.is_alive())
            .map(|(&id, slot)| Delivery {
                id,
                pass,
                callback: slot.downgrade(),
                value: Arc::clone(value),
            });

        let _num_before = self.queue.len();
        self.queue.extend(deliveries);

        #[cfg(feature = "tracing")]
        {
            let num_subscribers = self.queue.len() - _num_before;
            if num_subscribers > 0 {
                tracing::debug!("Notifying {num_subscribers} subscribers");
            } else {
                tracing::debug!("No subscribers");
            }
        }
    }

    /// Take the deliveries of the pass at the front of the queue.
    ///
    /// Subscribers that were removed since the pass was scheduled are left
    /// out. Returns `None` if nothing is scheduled.
    fn start_pass(&mut self) -> Option<Pass<T>> {
        let pass = self.queue.front()?.pass;
        let mut deliveries = Vec::new();

        while self.queue.front().is_some_and(|delivery| delivery.pass == pass) {
            let Some(Delivery { id, callback, value, .. }) = self.queue.pop_front() else {
                break;
            };
            if !self.subscribers.contains_key(&id) {
                #[cfg(feature = "tracing")]
                tracing::trace!(id, "Skipping subscriber removed before its pass");
                continue;
            }
            if let Some(callback) = callback.upgrade() {
                deliveries.push((callback, value));
            }
        }

        Some(deliveries)
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableState")
            .field("value", &**self.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "tracing")]
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}
