use backon::{BackoffBuilder, Retryable};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::Level;

/// Declarative retry/deadline policy applied around one async operation.
///
/// The policy never inspects the operation itself: callers hand it a closure
/// producing a fresh attempt and a predicate naming which errors are worth
/// another try. Between attempts it sleeps `interval`, growing the pause by
/// `increase` after every retry (linear backoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. `0` behaves like `1`.
    pub tries: usize,
    /// Pause before the second attempt.
    pub interval: Duration,
    /// Added to the pause after every retry; zero gives constant spacing.
    pub increase: Duration,
    /// Deadline applied to each individual attempt.
    pub total_timeout: Option<Duration>,
    pub show_logs: bool,
    /// Level used for retry notices when `show_logs` is set.
    pub log_level: Level,
    /// Surface failures instead of yielding [`RetryOutcome::Exhausted`]: a
    /// timed-out attempt fails at once with [`RetryError::Timeout`] and the last
    /// retryable error is returned as [`RetryError::Exhausted`].
    pub raise_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 2,
            interval: Duration::from_secs(2),
            increase: Duration::ZERO,
            total_timeout: None,
            show_logs: false,
            log_level: Level::DEBUG,
            raise_on_failure: false,
        }
    }
}

/// Result of a policy run that did not raise.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Completed(T),
    /// Every attempt failed with a retryable error or timed out.
    Exhausted,
}

#[derive(Debug, ThisError)]
pub enum RetryError<E> {
    #[error("attempt {attempts} timed out after {limit:?}")]
    Timeout { attempts: usize, limit: Duration },

    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: usize, last_error: E },

    /// The operation failed with an error outside the retryable set.
    #[error("{0}")]
    Fatal(E),
}

#[derive(Debug)]
enum AttemptError<E> {
    Failed(E),
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Failed(err) => write!(f, "{err}"),
            AttemptError::TimedOut(limit) => write!(f, "timeout error after {limit:?}"),
        }
    }
}

impl RetryPolicy {
    /// Generic policy for outbound calls: 2 tries, 1s apart, 4s per attempt.
    pub fn base() -> Self {
        Self {
            tries: 2,
            interval: Duration::from_secs(1),
            total_timeout: Some(Duration::from_secs(4)),
            show_logs: true,
            ..Self::default()
        }
    }

    /// Policy tuned for Square: 2 tries, 2s apart, 10s per attempt.
    pub fn square() -> Self {
        Self {
            tries: 2,
            interval: Duration::from_secs(2),
            total_timeout: Some(Duration::from_secs(10)),
            show_logs: true,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> LinearBuilder {
        LinearBuilder {
            interval: self.interval,
            increase: self.increase,
            max_times: self.tries.saturating_sub(1),
        }
    }

    /// Runs `op` under this policy.
    ///
    /// Errors for which `is_retryable` returns `false` end the run immediately
    /// as [`RetryError::Fatal`]. A successful attempt is returned as soon as it
    /// completes; later attempts never start.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        mut op: F,
        is_retryable: P,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let attempts = AtomicUsize::new(0);
        let deadline = self.total_timeout;

        let result = (|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            let attempt = op();
            async move {
                match deadline {
                    Some(limit) => match tokio::time::timeout(limit, attempt).await {
                        Ok(res) => res.map_err(AttemptError::Failed),
                        Err(_) => Err(AttemptError::TimedOut(limit)),
                    },
                    None => attempt.await.map_err(AttemptError::Failed),
                }
            }
        })
        .retry(self.backoff())
        .when(|err: &AttemptError<E>| match err {
            AttemptError::TimedOut(_) => !self.raise_on_failure,
            AttemptError::Failed(e) => is_retryable(e),
        })
        .notify(|err: &AttemptError<E>, delay: Duration| {
            self.emit(format_args!(
                "Error: {err}, retrying # {} in {delay:?}...",
                attempts.load(Ordering::Relaxed)
            ));
        })
        .await;

        let attempts = attempts.into_inner();
        match result {
            Ok(value) => Ok(RetryOutcome::Completed(value)),
            Err(AttemptError::TimedOut(limit)) if self.raise_on_failure => {
                self.emit(format_args!("Timeout error, try {attempts} times."));
                Err(RetryError::Timeout { attempts, limit })
            }
            Err(AttemptError::Failed(err)) if !is_retryable(&err) => Err(RetryError::Fatal(err)),
            Err(AttemptError::Failed(err)) if self.raise_on_failure => Err(RetryError::Exhausted {
                attempts,
                last_error: err,
            }),
            Err(err) => {
                self.emit(format_args!("Giving up after {attempts} attempt(s): {err}"));
                Ok(RetryOutcome::Exhausted)
            }
        }
    }

    fn emit(&self, message: fmt::Arguments<'_>) {
        if !self.show_logs {
            return;
        }
        let level = self.log_level;
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}

/// `backon` builder for linearly growing delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBuilder {
    interval: Duration,
    increase: Duration,
    max_times: usize,
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            next: self.interval,
            increase: self.increase,
            remaining: self.max_times,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearBackoff {
    next: Duration,
    increase: Duration,
    remaining: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.next;
        self.next = self.next.saturating_add(self.increase);
        Some(delay)
    }
}
