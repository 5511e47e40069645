//! Per-call time budgets for store round trips.

use std::future::Future;
use std::time::Duration;

use alertdesk_repository::StoreError;
use tracing::warn;

/// Run a store call under `limit`. An elapsed budget becomes `StoreError::Timeout`
/// and the in-flight call is dropped; nothing is retried.
pub async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = operation,
                limit_ms = limit.as_millis() as u64,
                "Store call timed out"
            );
            Err(StoreError::timeout(operation, limit.as_millis() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result: Result<(), StoreError> = bounded("slow", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout { elapsed_ms: 5000, .. })));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result = bounded("fast", Duration::from_secs(5), async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
