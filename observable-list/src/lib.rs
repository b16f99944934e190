//! A shared, observable list.
//!
//! This crate implements a basic form of the [Observer pattern][] for an
//! ordered list of values. [`ObservableList<T>`] holds a `Vec<T>` and calls
//! every registered subscriber synchronously whenever the list is written to.
//! It is meant to be the single source of truth for some piece of state that
//! several independent consumers (views, background jobs, …) read and update.
//!
//! Here is a quick walk-through:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use observable_list::ObservableList;
//!
//! let sources = ObservableList::new(Vec::new());
//!
//! // Subscribers are called with the current value before `subscribe`
//! // returns, then once for every write.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let subscription = sources.subscribe({
//!     let seen = seen.clone();
//!     move |values: &[&'static str]| seen.lock().unwrap().push(values.to_vec())
//! });
//!
//! sources.set(vec!["https://example.org"]);
//! // Every write notifies, even if the value doesn't change.
//! sources.set(vec!["https://example.org"]);
//! // `update` computes the new value from the latest one.
//! sources.update(|values| {
//!     let mut values = values.to_vec();
//!     values.push("https://example.com");
//!     values
//! });
//!
//! assert_eq!(
//!     *seen.lock().unwrap(),
//!     [
//!         vec![],
//!         vec!["https://example.org"],
//!         vec!["https://example.org"],
//!         vec!["https://example.org", "https://example.com"],
//!     ]
//! );
//!
//! // Dropping the subscription (or calling `unsubscribe` on it) stops
//! // further notifications.
//! drop(subscription);
//! sources.set(Vec::new());
//! assert_eq!(seen.lock().unwrap().len(), 4);
//! ```
//!
//! Writes from inside a subscriber callback are allowed. They take effect
//! immediately and are delivered after the notifications that are already
//! underway, so there is no unbounded recursion and every subscriber sees
//! every value in order. If a subscriber panics, the remaining subscribers are
//! still notified and the panic is resumed afterwards.
//!
//! Cargo features:
//!
//! - `tracing`: Emit [tracing] events when updates are sent out
//!
//! [Observer pattern]: https://en.wikipedia.org/wiki/Observer_pattern
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms, unreachable_pub)]
// https://github.com/rust-lang/rust-clippy/issues/10486
#![allow(clippy::double_must_use)]

mod list;
mod read_guard;
mod reader;
mod state;
mod stream;
mod subscription;

pub use self::{
    list::ObservableList, read_guard::ObservableReadGuard, reader::ListReader, stream::Updates,
    subscription::Subscription,
};
