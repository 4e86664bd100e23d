// Retry loop — bounded exponential backoff around one transport attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use skugen_types::config::RetryPolicy;
use skugen_types::error::Error;
use tokio::time::Instant;

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted.
///
/// - delay = `base_delay * backoff_multiplier^attempt`, capped at `max_delay`
/// - jitter scales the delay by a random factor in `0.5..=1.5`, re-capped
/// - a server `Retry-After` replaces the computed delay; one longer than
///   `max_delay` ends the loop immediately
/// - with `max_elapsed` set, a retry whose sleep would cross it is not attempted
///
/// `policy.on_retry` sees `(error, attempt, delay)` before each sleep.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.retryable || attempt >= policy.max_retries {
            return Err(err);
        }
        if let Some(retry_after) = err.retry_after {
            if retry_after.as_secs_f64() > policy.max_delay {
                tracing::debug!(?retry_after, "Retry-After exceeds max_delay, giving up");
                return Err(err);
            }
        }

        let delay = calculate_delay(policy, attempt, err.retry_after);
        if let Some(budget) = policy.max_elapsed {
            if (started.elapsed() + delay).as_secs_f64() > budget {
                tracing::debug!(attempt, "retry budget exhausted");
                return Err(err);
            }
        }

        attempt += 1;
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient failure, retrying"
        );
        if let Some(callback) = &policy.on_retry {
            callback(&err, attempt, delay);
        }
        tokio::time::sleep(delay).await;
    }
}

/// Backoff delay before retry number `attempt + 1`.
pub(crate) fn calculate_delay(
    policy: &RetryPolicy,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after;
    }

    let delay_secs = (policy.base_delay * policy.backoff_multiplier.powi(attempt as i32))
        .min(policy.max_delay);
    let delay_secs = if policy.jitter {
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.5);
        (delay_secs * factor).min(policy.max_delay)
    } else {
        delay_secs
    };

    Duration::from_secs_f64(delay_secs.max(0.0))
}
