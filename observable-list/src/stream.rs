use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_core::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    state::{Callback, ObservableState},
    Subscription,
};

/// A stream of the values of an observable list.
///
/// The first item is the value at the time of subscribing, after that every
/// update is yielded in order. Values are buffered, so a slow consumer sees
/// every one of them rather than only the latest.
///
/// Dropping the stream unsubscribes. The stream ends once the last
/// [`ObservableList`](crate::ObservableList) handle is dropped and all
/// buffered values have been yielded.
#[derive(Debug)]
pub struct Updates<T> {
    receiver: UnboundedReceiver<Vec<T>>,
    _subscription: Subscription<T>,
}

impl<T> Updates<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(state: &Arc<ObservableState<T>>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let callback: Arc<Callback<T>> = Arc::new(move |values: &[T]| {
            // The receiver is only gone while this stream is being dropped.
            let _ = sender.send(values.to_vec());
        });

        // The registry owns the sender so that closing the list ends the
        // stream.
        let subscription = Subscription::register(state, callback, true);
        Self { receiver, _subscription: subscription }
    }
}

impl<T> Stream for Updates<T> {
    type Item = Vec<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
