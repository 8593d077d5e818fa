//! Per-call judge policy: timeout enforcement and transient-failure retry.

use std::future::Future;

use tokio::time::{sleep, timeout};
use tracing::warn;

use thema_core::config::RefinementConfig;
use thema_core::errors::JudgeError;

/// Run one judge call under the configured policy.
///
/// Each attempt races the configured timeout; an elapsed timeout is
/// returned immediately as `JudgeError::Timeout` and never retried.
/// `Unavailable` is retried up to `judge_retries` times with doubling
/// backoff. Any other outcome passes through unchanged.
pub async fn call_with_policy<T, F, Fut>(
    config: &RefinementConfig,
    mut call: F,
) -> Result<T, JudgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JudgeError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match timeout(config.judge_timeout(), call()).await {
            Err(_) => {
                return Err(JudgeError::Timeout {
                    seconds: config.judge_timeout_secs,
                });
            }
            Ok(Err(JudgeError::Unavailable { reason })) => {
                if attempt >= config.judge_retries {
                    return Err(JudgeError::Unavailable { reason });
                }
                let backoff = config.retry_backoff() * 2u32.saturating_pow(attempt.min(16));
                warn!(%reason, attempt, backoff_ms = backoff.as_millis() as u64, "judge unavailable, backing off");
                sleep(backoff).await;
                attempt += 1;
            }
            Ok(other) => return other,
        }
    }
}
