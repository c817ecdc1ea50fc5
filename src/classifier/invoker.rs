//! Bounded-concurrency chunk classification.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt, TryStreamExt};

use super::{ClassifierError, TransactionClassifier};
use crate::models::{BusinessContext, Classification, SourceTransaction};

/// Default number of concurrent in-flight classifier calls per chunk.
pub const DEFAULT_CLASSIFY_CONCURRENCY: usize = 5;

/// Classify every transaction in `items` with at most `concurrency` calls in
/// flight, preserving input order.
///
/// `on_progress(completed, total)` runs after each call finishes; it is
/// observability only and has no effect on control flow. Any failed call
/// aborts the whole chunk so partial results never reach the persister - a
/// retried step re-plans the identical window and starts over.
pub async fn classify_chunk(
    classifier: &dyn TransactionClassifier,
    items: &[SourceTransaction],
    context: &BusinessContext,
    concurrency: usize,
    on_progress: impl Fn(usize, usize) + Sync,
) -> Result<Vec<Classification>, ClassifierError> {
    let total = items.len();
    let completed = AtomicUsize::new(0);
    let completed = &completed;
    let on_progress = &on_progress;

    // Build the per-item futures eagerly: each is constructed with the
    // concrete borrow lifetime of `items`, which avoids demanding a
    // higher-ranked (`for<'a>`) bound from a closure passed to a lazy stream
    // combinator. Constructing a future does not poll it, so ordering and
    // bounded concurrency below are unchanged.
    let calls: Vec<_> = items
        .iter()
        .map(|txn| classify_one(classifier, txn, context, completed, total, on_progress))
        .collect();

    stream::iter(calls)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Classify a single transaction and report its completion.
///
/// Extracted into a named `async fn` so its signature carries the
/// higher-ranked lifetimes the borrowed `txn` needs; an inline `async move`
/// block is not general enough over lifetimes when the resulting future is
/// driven from a detached (`'static`) task.
async fn classify_one(
    classifier: &dyn TransactionClassifier,
    txn: &SourceTransaction,
    context: &BusinessContext,
    completed: &AtomicUsize,
    total: usize,
    on_progress: &(impl Fn(usize, usize) + Sync),
) -> Result<Classification, ClassifierError> {
    let result = classifier.classify(txn, context).await?;
    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    on_progress(done, total);
    Ok(result)
}
