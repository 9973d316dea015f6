//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that
//! drives subscribers from a [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Debounced / Throttled / BoundedRunner ── publish(Event) ──► Bus
//!                                                             │
//!                                               SubscriberSet::listen()
//!                                                             │
//!                                                    ┌────────┼────────┐
//!                                                    ▼        ▼        ▼
//!                                                LogWriter  Metrics  Custom
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
