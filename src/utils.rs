//! Retry helpers for Telegram API operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};

/// Whether a failed Telegram request is worth repeating.
///
/// Network hiccups and flood-control responses are transient; API errors such
/// as "bot was blocked by the user" are not.
#[must_use]
pub const fn is_transient(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Sleeps out a flood-control pause before passing the result on.
///
/// Telegram's `retry_after` can exceed the retry backoff, so the wait happens
/// inside the attempt and the following retry lands after the pause.
pub async fn wait_out_flood_control<T>(result: Result<T, RequestError>) -> Result<T, RequestError> {
    if let Err(RequestError::RetryAfter(pause)) = &result {
        warn!("Telegram flood control, waiting {}s", pause.seconds());
        tokio::time::sleep(pause.duration()).await;
    }
    result
}

/// Retries an operation with exponential backoff and jitter while `should_retry`
/// holds for the error.
///
/// # Errors
///
/// Returns the last error once retries are exhausted or the error is permanent.
///
/// # Examples
///
/// ```
/// use account_market_bot::utils::retry_telegram_operation;
///
/// # async fn example() -> Result<(), String> {
/// let value = retry_telegram_operation(|| async { Ok::<_, String>(7) }, |_| true).await?;
/// assert_eq!(value, 7);
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T, E, C>(operation: F, should_retry: C) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: FnMut(&E) -> bool,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, should_retry)
        .await
        .map_err(|e| {
            warn!("Telegram API operation failed: {}", e);
            e
        })
}
