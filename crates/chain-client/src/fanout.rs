//! Concurrent per-item fetches joined back in input order.

use std::future::Future;

use tokio::task::JoinSet;

use crate::error::BackendError;

/// Run `fetch` for every item concurrently and return the results in the
/// order of `items`, whatever order the fetches complete in.
///
/// The first error is returned as-is; dropping the set aborts the fetches
/// still in flight.
pub async fn fetch_ordered<I, T, F, Fut>(items: Vec<I>, fetch: F) -> Result<Vec<T>, BackendError>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
{
    let mut slots: Vec<Option<T>> = items.iter().map(|_| None).collect();
    let mut tasks = JoinSet::new();
    for (slot, item) in items.into_iter().enumerate() {
        let fut = fetch(item);
        tasks.spawn(async move { (slot, fut.await) });
    }

    while let Some(joined) = tasks.join_next().await {
        let (slot, result) =
            joined.map_err(|e| BackendError::Unavailable(format!("fetch task failed: {e}")))?;
        slots[slot] = Some(result?);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(slot, value)| {
            value.ok_or_else(|| BackendError::Unavailable(format!("fetch {slot} never completed")))
        })
        .collect()
}
