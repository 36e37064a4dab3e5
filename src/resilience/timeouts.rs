//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap a single backend call with a per-route deadline
//! - Distinguish timeout from other transport errors
//!
//! # Design Decisions
//! - Uses `tokio::time::timeout`; timed-out requests surface as
//!   `Elapsed` and the dispatcher maps that to 504 Gateway Timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Race `future` against `duration`, returning `Err(Elapsed)` if the
/// deadline passes first.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_before_deadline() {
        let result = with_timeout(Duration::from_millis(50), async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn elapses_past_deadline() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            42
        })
        .await;
        assert!(result.is_err());
    }
}
