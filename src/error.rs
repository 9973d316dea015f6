//! Error types used by the controllers and the bounded runner.
//!
//! This module defines two enums:
//!
//! - [`ConfigError`]: invalid configuration, raised synchronously at construction.
//! - [`RunError`]: outcome of a failed [`BoundedRunner::run`](crate::BoundedRunner::run).
//!
//! Errors returned by wrapped functions and tasks are never transformed: for
//! [`Debounced`](crate::Debounced) and [`Throttled`](crate::Throttled) they are part of the
//! cached result type, for the runner they travel inside [`RunError::Task`].

use thiserror::Error;

/// # Invalid configuration.
///
/// Raised when a controller or runner is built, never at call time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The runner was asked to keep zero tasks in flight.
    #[error("concurrency must be greater than zero")]
    ZeroConcurrency,

    /// Debounce with neither edge enabled would never invoke the function.
    #[error("debounce needs at least one of `leading` or `trailing`")]
    NoEdges,

    /// The default tokio timer was requested outside of a tokio runtime.
    #[error("no tokio runtime is available to drive timers")]
    NoRuntime,

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pacer::ConfigError;
    ///
    /// assert_eq!(ConfigError::ZeroConcurrency.as_label(), "config_zero_concurrency");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroConcurrency => "config_zero_concurrency",
            ConfigError::NoEdges => "config_no_edges",
            ConfigError::NoRuntime => "config_no_runtime",
            ConfigError::Parse(_) => "config_parse",
        }
    }
}

/// # Errors produced by a fail-fast run.
///
/// `E` is the task's own error type, passed through unchanged.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError<E> {
    /// The runner configuration was rejected before any task started.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ConfigError),

    /// A task failed; admission stopped and in-flight tasks were drained.
    #[error("task #{index} failed: {error}")]
    Task {
        /// Submission index of the failed task.
        index: usize,
        /// The task's error, untouched.
        error: E,
    },

    /// The run was cancelled; in-flight tasks finished, queued ones never started.
    #[error("run cancelled after {completed} task(s); {not_started} never started")]
    Cancelled {
        /// Tasks that completed successfully before the run stopped.
        completed: usize,
        /// Tasks still queued when cancellation was observed.
        not_started: usize,
    },
}

impl<E> RunError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::InvalidArgument(_) => "run_invalid_argument",
            RunError::Task { .. } => "run_task_failed",
            RunError::Cancelled { .. } => "run_cancelled",
        }
    }

    /// Returns the task error if this is a [`RunError::Task`].
    pub fn into_task_error(self) -> Option<E> {
        match self {
            RunError::Task { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ConfigError::NoEdges.as_label(), "config_no_edges");
        assert_eq!(ConfigError::NoRuntime.as_label(), "config_no_runtime");

        let err: RunError<std::io::Error> = ConfigError::ZeroConcurrency.into();
        assert_eq!(err.as_label(), "run_invalid_argument");
        assert_eq!(err.to_string(), "invalid argument: concurrency must be greater than zero");
    }

    #[test]
    fn task_error_is_passed_through() {
        let err = RunError::Task {
            index: 3,
            error: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "task #3 failed: disk full");
        let inner = err.into_task_error().map(|e| e.to_string());
        assert_eq!(inner.as_deref(), Some("disk full"));
    }
}
