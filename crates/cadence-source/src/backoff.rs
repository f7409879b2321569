// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential-backoff retry for rate-limited tracker calls.
//!
//! Only `SourceError::RateLimited` is retried; every other error
//! propagates immediately. A server-provided retry-after hint overrides
//! the computed delay for that attempt.

use std::future::Future;
use std::time::Duration;

use cadence_core::SourceError;
use tracing::warn;

/// Run `op`, retrying rate-limited failures up to `max_attempts` total
/// attempts with exponential backoff starting at `base_delay`.
pub async fn retry_rate_limited<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(SourceError::RateLimited { retry_after }) => {
                attempt += 1;
                if attempt >= max_attempts.max(1) {
                    return Err(SourceError::RateLimited { retry_after });
                }
                let delay = retry_after
                    .unwrap_or_else(|| base_delay * 2u32.saturating_pow(attempt - 1));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
