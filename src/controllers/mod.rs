//! Rate-limiting controllers around plain functions.
//!
//! - [`Debounced`] collapses bursts of calls into leading and/or trailing invocations.
//! - [`Throttled`] caps invocations at one per window.
//!
//! Both keep their invocation record behind one lock, run the wrapped function
//! outside of it, and own at most one live timer (see `slot`).

mod debounce;
mod slot;
mod throttle;

pub use debounce::{DebounceBuilder, Debounced, debounce};
pub use throttle::{ThrottleBuilder, Throttled, throttle};
