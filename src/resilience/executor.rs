//! Retry-with-backoff executor.
//!
//! # Responsibilities
//! - Invoke a fallible async operation up to `max_tries` times
//! - Sleep between attempts (base delay first, calculator afterwards)
//! - Surface the last failure once tries are exhausted

use std::future::Future;
use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::resilience::backoff::{self, DelayFn};

/// One retryable unit of work.
pub struct Task<F> {
    name: String,
    work: F,
    max_tries: u32,
    delay: Duration,
    next_delay: DelayFn,
}

impl<F> Task<F> {
    /// Single-try task with no delay.
    pub fn new(name: impl Into<String>, work: F) -> Self {
        Self {
            name: name.into(),
            work,
            max_tries: 1,
            delay: Duration::ZERO,
            next_delay: backoff::fixed(),
        }
    }

    /// Total attempts, including the first. Zero is treated as one.
    pub fn max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries.max(1);
        self
    }

    /// Delay before the first retry.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Custom calculator for the delays after the first retry.
    pub fn delay_fn(mut self, next_delay: DelayFn) -> Self {
        self.next_delay = next_delay;
        self
    }
}

/// Runs tasks, filling in unset parameters from configuration.
#[derive(Debug, Clone)]
pub struct Executor {
    max_tries: u32,
    base_delay: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}

impl Executor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            max_tries: config.max_tries.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// A task using the configured tries and base delay.
    pub fn task<F>(&self, name: impl Into<String>, work: F) -> Task<F> {
        Task::new(name, work)
            .max_tries(self.max_tries)
            .delay(self.base_delay)
    }

    /// Run `task` until it succeeds or its tries are exhausted.
    pub async fn run<F, Fut, T, E>(&self, task: Task<F>) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let Task {
            name,
            mut work,
            max_tries,
            delay,
            next_delay,
        } = task;

        let mut attempt = 0;
        let mut wait = delay;

        loop {
            attempt += 1;
            match work().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(task = %name, attempt, "Task succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_tries => {
                    tracing::warn!(task = %name, attempts = attempt, error = %e, "Task failed, retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    if attempt > 1 {
                        wait = next_delay(wait, attempt);
                    }
                    tracing::debug!(task = %name, attempt, delay = ?wait, error = %e, "Task failed, retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
