//! Delay calculators for the executor.
//!
//! A calculator receives the previous delay and the number of failed
//! attempts so far and returns the next delay.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Computes the next retry delay from (previous delay, failed attempts).
pub type DelayFn = Arc<dyn Fn(Duration, u32) -> Duration + Send + Sync>;

/// Reuse the previous delay unchanged.
pub fn fixed() -> DelayFn {
    Arc::new(|previous, _| previous)
}

/// Multiply the previous delay by `factor`, capped at `max`.
pub fn exponential(factor: u32, max: Duration) -> DelayFn {
    Arc::new(move |previous, _| previous.saturating_mul(factor).min(max))
}

/// Exponential backoff from `base` keyed on the failure count, with jitter.
pub fn exponential_jitter(base: Duration, max: Duration) -> DelayFn {
    Arc::new(move |_, failed| calculate_backoff(failed, base, max))
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    let capped_delay = base.saturating_mul(exponential_base).min(max);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped_delay + Duration::from_millis(jitter)
}
