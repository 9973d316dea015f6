/// Lifecycle of a [`BoundedRunner`](crate::BoundedRunner).
///
/// ```text
/// Idle ──run──► Draining ──all done──► Idle
///                  └──cancel()──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// Admitting and awaiting tasks.
    Draining,
    /// Cancellation stopped admission; the token stays cancelled.
    Cancelled,
}

/// A task that returned an error during [`run_settled`](crate::BoundedRunner::run_settled).
#[derive(Debug)]
pub struct TaskFailure<E> {
    /// Submission index of the task.
    pub index: usize,
    /// The task's own error.
    pub error: E,
}

/// Outcome of a best-effort run.
#[derive(Debug)]
pub struct RunReport<T, E> {
    /// Successful results, in completion order.
    pub results: Vec<T>,
    /// Failed tasks, in completion order.
    pub failures: Vec<TaskFailure<E>>,
    /// Tasks never admitted because the run was cancelled.
    pub not_started: usize,
}

impl<T, E> RunReport<T, E> {
    /// True when every task ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.not_started == 0
    }

    /// Number of tasks that ran to completion, successfully or not.
    pub fn finished(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}
