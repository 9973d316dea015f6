//! # Controller and runner configuration.
//!
//! Provides the option structs consumed by [`debounce`](crate::debounce),
//! [`throttle`](crate::throttle) and [`BoundedRunner`](crate::BoundedRunner), plus an
//! aggregate [`Config`] that can be loaded from TOML.
//!
//! All structs deserialize with `#[serde(default)]`, so a document only needs the
//! fields it overrides. Durations use humantime syntax (`"250ms"`, `"1s"`).
//!
//! ```toml
//! wait = "300ms"
//!
//! [debounce]
//! leading = false
//! trailing = true
//! max_wait = "1s"
//!
//! [throttle]
//! leading = true
//! trailing = false
//!
//! [runner]
//! concurrency = 4
//! ```
//!
//! ## Sentinel values
//! - `max_wait = None` → no ceiling on how long a debounce burst may be suppressed
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Edge policy for a [`Debounced`](crate::Debounced) controller.
///
/// Defaults: trailing edge only, no `max_wait`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebounceOptions {
    /// Invoke at the start of a burst.
    pub leading: bool,
    /// Invoke once the burst has been quiet for `wait`.
    pub trailing: bool,
    /// Longest a burst may suppress invocation before one is forced.
    ///
    /// Values shorter than `wait` are raised to `wait`.
    #[serde(with = "humantime_serde")]
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }
}

impl DebounceOptions {
    /// Leading edge only: one invocation at the start of each burst.
    #[must_use]
    pub const fn leading_only() -> Self {
        Self {
            leading: true,
            trailing: false,
            max_wait: None,
        }
    }

    /// Returns a copy with the given `max_wait` ceiling.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Rejects configurations that could never invoke the wrapped function.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.leading && !self.trailing {
            return Err(ConfigError::NoEdges);
        }
        Ok(())
    }

    /// Effective ceiling for a given `wait`: never shorter than `wait` itself.
    #[inline]
    pub fn max_wait_for(&self, wait: Duration) -> Option<Duration> {
        self.max_wait.map(|m| m.max(wait))
    }
}

/// Edge policy for a [`Throttled`](crate::Throttled) controller.
///
/// Defaults: both edges enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThrottleOptions {
    /// Invoke immediately on the first call of a quiet period.
    pub leading: bool,
    /// Invoke with the latest arguments at the end of a window that saw suppressed calls.
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

/// Settings for a [`BoundedRunner`](crate::BoundedRunner).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum number of tasks in flight at once. Must be greater than zero.
    pub concurrency: usize,
    /// Capacity of the runner's own event bus (when it creates one).
    pub bus_capacity: usize,
}

impl RunnerConfig {
    /// Config with the given concurrency and default bus capacity.
    #[must_use]
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Fails with [`ConfigError::ZeroConcurrency`] when no task could ever be admitted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RunnerConfig {
    /// - `concurrency = 8`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            concurrency: 8,
            bus_capacity: 1024,
        }
    }
}

/// Aggregate configuration, typically loaded from a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period / window length shared by debounce and throttle.
    #[serde(with = "humantime_serde")]
    pub wait: Duration,
    /// Debounce edge policy.
    pub debounce: DebounceOptions,
    /// Throttle edge policy.
    pub throttle: ThrottleOptions,
    /// Bounded runner settings.
    pub runner: RunnerConfig,
}

impl Default for Config {
    /// - `wait = 300ms`
    /// - all sections at their own defaults
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(300),
            debounce: DebounceOptions::default(),
            throttle: ThrottleOptions::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(doc: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(doc).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.debounce.validate()?;
        self.runner.validate()
    }
}
