//! Diagnostic events raised while scheduling.
//!
//! The scheduling code never logs by itself; it hands events to a
//! [`Diagnostics`] sink. [`TracingDiagnostics`] forwards them to `tracing`.

use crate::path::PathIndex;
use std::sync::Mutex;

/// Something worth reporting that happened during a scheduling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedEvent {
    /// A path's recorded TDM slot does not match its index; the path was
    /// skipped.
    IndexMismatch { path: PathIndex, curr_tdn: u8 },

    /// Every considered path had a full quota; their quotas were reset.
    RoundWrapped { reset: usize },

    /// A segment had been tried on every available path; its path mask was
    /// cleared so it can be sent anywhere.
    MaskForgiven { seq: u32, path: PathIndex },
}

/// Sink for [`SchedEvent`]s.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, event: SchedEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, event: SchedEvent) {
        match event {
            SchedEvent::IndexMismatch { path, curr_tdn } => {
                tracing::warn!(
                    "path_index={} does not match TDN={}, skipping path",
                    path,
                    curr_tdn
                );
            }
            SchedEvent::RoundWrapped { reset } => {
                tracing::debug!("TDM round complete, reset quota on {} paths", reset);
            }
            SchedEvent::MaskForgiven { seq, path } => {
                tracing::debug!(
                    "segment seq={} tried on all paths, retrying on path {}",
                    seq,
                    path
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<SchedEvent>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the events recorded so far.
    pub fn drain(&self) -> Vec<SchedEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Diagnostics for Recorder {
    fn emit(&self, event: SchedEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
