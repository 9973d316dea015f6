//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: [`Debounced`](crate::Debounced), [`Throttled`](crate::Throttled),
//!   [`BoundedRunner`](crate::BoundedRunner), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: [`SubscriberSet::listen`](crate::SubscriberSet::listen), or any
//!   receiver obtained from [`Bus::subscribe`].

mod bus;
mod emitter;
mod event;

pub use bus::Bus;
pub(crate) use emitter::Emitter;
pub use event::{Event, EventKind};
