//! Scheduler tunables.
//!
//! [`Config`] is a plain value that can be built in code or loaded from JSON.
//! [`Tunables`] is the live handle the scheduler reads on every call; it can
//! be changed from another thread without restarting anything.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Default number of MSS-sized units in one burst.
pub const DEFAULT_BURST_SIZE: u32 = 10_000;

/// Configuration for the TDM scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of consecutive MSS units a path may send before yielding.
    pub burst_size: u32,

    /// Enforce the congestion-window test during the round-robin scan.
    pub cwnd_limited: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            burst_size: DEFAULT_BURST_SIZE,
            cwnd_limited: true,
        }
    }
}

impl Config {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the burst size.
    pub fn with_burst_size(mut self, burst_size: u32) -> Self {
        self.burst_size = burst_size;
        self
    }

    /// Enable or disable the congestion-window test in the round-robin scan.
    pub fn with_cwnd_limited(mut self, cwnd_limited: bool) -> Self {
        self.cwnd_limited = cwnd_limited;
        self
    }

    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(input: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), Error> {
        validate_burst_size(self.burst_size)
    }
}

fn validate_burst_size(burst_size: u32) -> Result<(), Error> {
    // A zero burst makes every path look both unused and full, and the
    // round would reset forever.
    if burst_size == 0 {
        return Err(Error::Config("burst_size must be positive".to_string()));
    }
    Ok(())
}

/// Live, shareable view of a [`Config`].
///
/// Clones share the same values.
#[derive(Debug, Clone)]
pub struct Tunables {
    inner: Arc<TunablesInner>,
}

#[derive(Debug)]
struct TunablesInner {
    burst_size: AtomicU32,
    cwnd_limited: AtomicBool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::from_valid(Config::default())
    }
}

impl Tunables {
    /// Build tunables from a config, rejecting invalid values.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: Config) -> Self {
        Self {
            inner: Arc::new(TunablesInner {
                burst_size: AtomicU32::new(config.burst_size),
                cwnd_limited: AtomicBool::new(config.cwnd_limited),
            }),
        }
    }

    pub fn burst_size(&self) -> u32 {
        self.inner.burst_size.load(Ordering::Relaxed)
    }

    /// Change the burst size. Takes effect on the next scheduling call.
    pub fn set_burst_size(&self, burst_size: u32) -> Result<(), Error> {
        validate_burst_size(burst_size)?;
        self.inner.burst_size.store(burst_size, Ordering::Relaxed);
        Ok(())
    }

    pub fn cwnd_limited(&self) -> bool {
        self.inner.cwnd_limited.load(Ordering::Relaxed)
    }

    pub fn set_cwnd_limited(&self, cwnd_limited: bool) {
        self.inner.cwnd_limited.store(cwnd_limited, Ordering::Relaxed);
    }

    /// Read both values at once.
    pub fn snapshot(&self) -> Config {
        Config {
            burst_size: self.burst_size(),
            cwnd_limited: self.cwnd_limited(),
        }
    }
}
