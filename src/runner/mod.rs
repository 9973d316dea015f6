//! # Bounded-concurrency task runner.
//!
//! [`BoundedRunner`] takes a list of task factories and keeps at most
//! `concurrency` of them in flight, admitting the rest strictly in submission order.
//!
//! ## Architecture
//! ```text
//!  tasks ──► pending (FIFO) ──admit while running < concurrency──► JoinSet
//!                 ▲                                                  │
//!                 └──────────── completion frees a slot ◄────────────┘
//! ```
//!
//! ## Rules
//! - A task starts when its factory is called at admission, never earlier.
//! - Results are collected in completion order.
//! - [`BoundedRunner::run`] is fail-fast: the first error stops admission, in-flight
//!   tasks are drained (not aborted), and the error is returned untouched.
//! - [`BoundedRunner::run_settled`] runs everything and reports every failure.
//! - Cancellation stops admission only; in-flight tasks still finish.
//! - A panicking task resumes its panic on the caller.

mod bounded;
mod report;

pub use bounded::{BoundedRunner, run_bounded};
pub use report::{RunReport, RunState, TaskFailure};
