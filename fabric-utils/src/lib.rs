//! Small shared helpers with no natural home in a single crate: bounded
//! retry with exponential backoff, used by the Snapshot Engine (spec §4.8
//! step 3) and the CDC Engine (spec §7 propagation policy) to retry
//! `Transient` errors before surfacing them as fatal.

use fabric_types::errors::FabricError;
use std::future::Future;
use std::time::Duration;

/// Retries `f` while it returns a retryable [`FabricError`], doubling the
/// delay after every attempt starting from `base_backoff`, up to
/// `max_retries` additional attempts beyond the first. Non-retryable errors
/// and success both return immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    max_retries: u32,
    base_backoff: Duration,
    mut f: F,
) -> Result<T, FabricError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FabricError>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && err.is_retryable() => {
                let delay = base_backoff * 2u32.pow(attempt);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FabricError::transient(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FabricError> = retry_with_backoff(2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FabricError::transient(std::io::Error::new(std::io::ErrorKind::Other, "boom"))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FabricError> = retry_with_backoff(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FabricError::NotFound { resource: "x".to_string() }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
