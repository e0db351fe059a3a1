use crate::venue::VenueError;
use std::future::Future;
use std::time::Duration;

/// Default retry ceiling (spec.md §4.5: "exponential backoff, max 3 attempts").
pub const MAX_ATTEMPTS: u32 = 3;

/// Run `op` up to [`MAX_ATTEMPTS`] times with exponential backoff, retrying only on the
/// [`VenueError`] variants spec.md §4.5 names as transient. Any other error, or the final
/// attempt's error, is returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(base_delay: Duration, mut op: F) -> Result<T, VenueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VenueError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                attempt += 1;
                tokio::time::sleep(base_delay * 2u32.pow(attempt - 1)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_error_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(Duration::from_millis(1), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(VenueError::Http { status: 503, body: "busy".into() })
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
    async fn test_non_retryable_error_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(Duration::from_millis(1), || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(VenueError::Http { status: 400, body: "bad request".into() })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
