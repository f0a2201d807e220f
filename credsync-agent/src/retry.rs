//! Constant-interval retry for cluster operations.

use crate::cluster::ClusterError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why a retried operation stopped without succeeding.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError {
    /// The cancellation signal fired before the next attempt.
    Cancelled,
    /// A non-retryable fault, returned as observed.
    Terminal(ClusterError),
}

/// Retry `op` with a fixed delay between attempts until it succeeds, fails
/// terminally, or `cancel` fires.
///
/// Only faults classified by [`ClusterError::is_retryable`] are repeated.
/// The wait between attempts is a suspension point; a blocked retry never
/// stalls sibling work, and cancellation is honored at every backoff
/// boundary.
pub async fn constant<F, Fut, T>(
    cancel: &CancellationToken,
    delay: Duration,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClusterError>>,
{
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => return Err(RetryError::Terminal(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transient() -> ClusterError {
        ClusterError::Unavailable("connection reset".into())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_faults_are_retried() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = constant(&cancel, Duration::from_secs(1), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_faults_stop_immediately() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = constant(&cancel, Duration::from_secs(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClusterError::Rejected("denied".into())) }
        })
        .await;

        assert_eq!(
            result,
            Err(RetryError::Terminal(ClusterError::Rejected(
                "denied".into()
            )))
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_at_backoff_boundary() {
        let cancel = CancellationToken::new();

        let result: Result<(), _> = {
            let canceller = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                    cancel.cancel();
                })
            };
            let outcome = constant(&cancel, Duration::from_secs(1), || async {
                Err::<(), _>(transient())
            })
            .await;
            canceller.await.unwrap();
            outcome
        };

        assert_eq!(result, Err(RetryError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_skips_the_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = constant(&cancel, Duration::from_secs(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
