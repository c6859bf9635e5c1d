//! Timeout utilities for browser calls
//!
//! Every CDP round trip is bounded so a wedged browser surfaces as a
//! distinguishable [`FetchError::Timeout`] instead of a hung worker.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::FetchError;

/// Wrap an async browser call with an explicit timeout
///
/// # Arguments
/// * `operation` - The async Future to execute
/// * `timeout` - Upper bound for the call
/// * `operation_name` - Name reported in the timeout error
pub async fn with_call_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &'static str,
) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            operation: operation_name,
            timeout,
        }),
    }
}

/// Run `check` every `interval` until it reports true or `timeout` elapses
///
/// A check error ends the wait at once. Each check is bounded by whichever is
/// shorter of `call_timeout` and the time left: a check cut short by the
/// overall deadline counts as "not found", one that exhausts `call_timeout`
/// is a [`FetchError::Timeout`].
pub async fn poll_until<F, Fut>(
    mut check: F,
    timeout: Duration,
    call_timeout: Duration,
    interval: Duration,
    operation_name: &'static str,
) -> Result<bool, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, FetchError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let cut_by_deadline = remaining < call_timeout;
        match with_call_timeout(check(), remaining.min(call_timeout), operation_name).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_timeout() && cut_by_deadline => return Ok(false),
            Err(e) => return Err(e),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }
}
