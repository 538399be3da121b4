//! Time-division multiplexing path scheduler for multipath transports.
//!
//! Given one connection carried over several paths, the scheduler decides for
//! each transmission opportunity which segment goes out, on which path, and
//! how many bytes that path may send in its current burst. Paths take turns:
//! each gets an exclusive burst of `burst_size` MSS units before the next one
//! is served.
//!
//! The host transport owns the [`Connection`] and keeps its path snapshots up
//! to date; the scheduler only reads them, apart from the per-path quota.

pub mod availability;
pub mod config;
pub mod connection;
pub mod diag;
pub mod error;
pub mod path;
pub mod scheduler;
pub mod segment;
pub mod selector;
pub mod source;
pub mod tdm;

pub use config::{Config, Tunables};
pub use connection::{Connection, MetaState, SegmentSource};
pub use diag::{Diagnostics, Recorder, SchedEvent, TracingDiagnostics};
pub use error::Error;
pub use path::{CaState, Path, PathIndex, SubflowState};
pub use scheduler::{MultipathScheduler, Scheduled, SchedulerRegistry};
pub use segment::{PathMask, Segment};
pub use tdm::TdmScheduler;

/// Result type for mptdm-sched operations.
pub type Result<T> = std::result::Result<T, Error>;
