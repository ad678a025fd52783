use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 100;

/// Run an idempotent read against the data store with a bounded timeout and
/// exponential backoff on transient failures.
///
/// Only `AppError::Transient` (connection-level failures, timeouts) is
/// retried; every other error surfaces immediately. Mutations must NOT go
/// through here — they carry no idempotency key.
pub async fn read_with_retry<T, F, Fut>(op: F) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let result = match tokio::time::timeout(READ_TIMEOUT, op()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Transient(format!(
                "read timed out after {}s",
                READ_TIMEOUT.as_secs()
            ))),
        };

        match result {
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                let backoff = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                tracing::warn!(
                    "Transient read failure (attempt {}/{}), retrying in {}ms: {}",
                    attempt,
                    MAX_ATTEMPTS,
                    backoff,
                    err
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            other => return other,
        }
    }
}
