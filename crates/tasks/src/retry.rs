use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

/// Build the jittered exponential backoff schedule shared by every
/// transient-retry call site (`bridge-evm-fetch`'s fetchers, the indexer's
/// non-rate-limit retry policy): start at `base`, double each attempt, cap at
/// `max_attempts`, with up to 50% jitter to avoid synchronized retries across
/// workers.
pub fn jittered_backoff(base: Duration, max_attempts: usize) -> ExponentialBuilder {
    ExponentialBuilder::default().with_min_delay(base).with_max_times(max_attempts).with_jitter()
}

/// Run `op` under the given backoff schedule, logging each retry at `target`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    target: &'static str,
    schedule: ExponentialBuilder,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    op.retry(schedule)
        .notify(|err: &E, dur: Duration| {
            tracing::warn!(target: target, %err, retry_in = ?dur, "retrying after transient error");
        })
        .await
}
