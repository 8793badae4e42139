//! Bounded fan-out that keeps results in input order.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

/// Detail fetches in flight at once for a single range
pub const DETAIL_FAN_OUT: usize = 8;

type IndexedFuture<T> = Pin<Box<dyn Future<Output = (usize, T)> + Send>>;

/// Run `task` for every item with at most `max_concurrent` in flight and
/// return the outputs in the order of `items`.
///
/// Every task runs to completion; a failing task reports through its own
/// output rather than cancelling its siblings.
pub async fn join_ordered<I, T, F, Fut>(items: Vec<I>, task: F, max_concurrent: usize) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    if items.is_empty() {
        return Vec::new();
    }

    let total = items.len();
    let max_concurrent = max_concurrent.max(1);
    debug!("Fanning out {total} tasks with max {max_concurrent} concurrent");

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut in_flight: FuturesUnordered<IndexedFuture<T>> = FuturesUnordered::new();
    let mut pending = items.into_iter().enumerate();

    let make_future = |index: usize, item: I| -> IndexedFuture<T> {
        let fut = task(item);
        Box::pin(async move { (index, fut.await) })
    };

    for (index, item) in pending.by_ref().take(max_concurrent) {
        in_flight.push(make_future(index, item));
    }

    while let Some((index, output)) = in_flight.next().await {
        slots[index] = Some(output);
        if let Some((next, item)) = pending.next() {
            in_flight.push(make_future(next, item));
        }
    }

    slots.into_iter().flatten().collect()
}
