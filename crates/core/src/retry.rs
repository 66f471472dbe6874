use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retries `op` up to `retries` additional times with exponential backoff,
/// sleeping `base_delay`, then `base_delay * backoff_factor`, and so on
/// between attempts. Only errors accepted by `retryable` are retried;
/// anything else propagates immediately. The sleeps run on the tokio clock
/// and are cancelled with the surrounding future.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    mut op: F,
    retries: u32,
    base_delay: Duration,
    backoff_factor: f64,
    mut retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnMut(&E) -> bool,
{
    let mut delay = base_delay;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && retryable(&err) => {
                attempt += 1;
                warn!(
                    attempt,
                    retries,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(backoff_factor);
            }
            Err(err) => return Err(err),
        }
    }
}
