//! Error types for mptdm-sched.
//!
//! Scheduling decisions never fail: "no path" and "nothing to send" are
//! reported as `None`. Errors only come out of setup operations.

use thiserror::Error;

/// Errors that can occur while configuring the scheduler or its inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid tunable value.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid path setup (bad index, duplicate path).
    #[error("path error: {0}")]
    Path(String),

    /// A scheduler with the same name is already registered.
    #[error("scheduler already registered: {name}")]
    AlreadyRegistered { name: String },

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
