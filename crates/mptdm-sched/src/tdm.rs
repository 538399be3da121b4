//! Time-division multiplexing scheduler.
//!
//! Every path gets an exclusive burst of `burst_size` MSS units before the
//! next one gets a turn. Each path keeps a quota of units granted in the
//! current round:
//!
//! - a path with a burst in progress (`0 < quota < burst_size`) keeps
//!   sending until its burst is used up,
//! - otherwise an unused path (`quota == 0`) starts a new burst,
//! - once every available path is full, all their quotas go back to 0 and a
//!   new round starts.
//!
//! Reinjected segments bypass the round and are sent whole on any path they
//! have not been queued on yet.

use crate::availability::is_available;
use crate::config::{Config, Tunables};
use crate::connection::{Connection, SegmentSource};
use crate::diag::{Diagnostics, SchedEvent, TracingDiagnostics};
use crate::path::{Path, PathIndex};
use crate::scheduler::{MultipathScheduler, Scheduled};
use crate::segment::Segment;
use crate::selector::select_subflow;
use crate::source::next_candidate;
use std::fmt;
use std::sync::Arc;

/// Name of the TDM scheduler in a [`SchedulerRegistry`](crate::SchedulerRegistry).
pub const TDM_SCHEDULER_NAME: &str = "tdm";

/// Round-robin burst scheduler.
pub struct TdmScheduler {
    tunables: Tunables,
    diag: Arc<dyn Diagnostics>,
}

impl Default for TdmScheduler {
    fn default() -> Self {
        Self::new(Tunables::default())
    }
}

impl fmt::Debug for TdmScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TdmScheduler")
            .field("tunables", &self.tunables.snapshot())
            .finish()
    }
}

impl TdmScheduler {
    /// Create a scheduler reading the given tunables on every call.
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            diag: Arc::new(TracingDiagnostics),
        }
    }

    /// Send diagnostic events to `diag` instead of `tracing`.
    pub fn with_diagnostics(mut self, diag: Arc<dyn Diagnostics>) -> Self {
        self.diag = diag;
        self
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    fn schedule_reinjection(&self, conn: &mut Connection) -> Option<Scheduled> {
        let Connection {
            meta,
            paths,
            reinject_queue,
            ..
        } = conn;
        let segment = reinject_queue.front_mut()?;
        let path = select_subflow(meta, paths, Some(&mut *segment), false, &*self.diag)?;

        Some(Scheduled {
            segment: *segment,
            source: SegmentSource::Reinject,
            path,
            limit: 0,
        })
    }

    fn schedule_burst(&self, conn: &mut Connection, config: Config) -> Option<Scheduled> {
        let diag = &*self.diag;
        let segment = *conn.send_queue.front()?;
        let (pos, remaining) = pick_burst_path(&mut conn.paths, &segment, config, diag)?;

        let path = &mut conn.paths[pos];
        // The scan may have run without the cwnd test.
        if !is_available(path, Some(&segment), false, true, diag) {
            return None;
        }

        let mss = path.mss.max(1);
        path.quota = path.quota.saturating_add(quota_units(segment.len, mss));

        Some(Scheduled {
            segment,
            source: SegmentSource::Send,
            path: path.index(),
            limit: remaining.saturating_mul(mss),
        })
    }
}

impl MultipathScheduler for TdmScheduler {
    fn name(&self) -> &'static str {
        TDM_SCHEDULER_NAME
    }

    fn get_subflow(
        &self,
        conn: &Connection,
        segment: Option<&mut Segment>,
        zero_window_test: bool,
    ) -> Option<PathIndex> {
        select_subflow(
            &conn.meta,
            &conn.paths,
            segment,
            zero_window_test,
            &*self.diag,
        )
    }

    fn next_segment(&self, conn: &mut Connection) -> Option<Scheduled> {
        let config = self.tunables.snapshot();
        let (_, source) = next_candidate(conn)?;
        match source {
            SegmentSource::Reinject => self.schedule_reinjection(conn),
            SegmentSource::Send => self.schedule_burst(conn, config),
        }
    }
}

/// Find the path owning the current burst and the MSS units it has left.
///
/// A burst in progress is never interrupted. Otherwise the last unused path
/// starts a new burst. When every available path is full, their quotas are
/// reset and the scan runs once more.
fn pick_burst_path(
    paths: &mut [Path],
    segment: &Segment,
    config: Config,
    diag: &dyn Diagnostics,
) -> Option<(usize, u32)> {
    let burst_size = config.burst_size;
    let mut wrapped = false;

    loop {
        let mut considered = Vec::with_capacity(paths.len());
        let mut full = 0usize;
        let mut unused = None;

        for (pos, path) in paths.iter().enumerate() {
            if !is_available(path, Some(segment), false, config.cwnd_limited, diag) {
                continue;
            }
            considered.push(pos);

            let quota = path.quota;
            if quota > 0 && quota < burst_size {
                return Some((pos, burst_size - quota));
            }
            if quota == 0 {
                unused = Some((pos, burst_size));
            }
            if quota >= burst_size {
                full += 1;
            }
        }

        if considered.is_empty() {
            return None;
        }
        if considered.len() != full {
            return unused;
        }
        // Unreachable with burst_size >= 1: after a reset every quota is 0.
        if wrapped {
            return None;
        }

        for &pos in &considered {
            paths[pos].quota = 0;
        }
        diag.emit(SchedEvent::RoundWrapped { reset: full });
        wrapped = true;
    }
}

/// Quota units charged for sending `len` bytes with the given MSS.
fn quota_units(len: u32, mss: u32) -> u32 {
    if len > mss {
        len.div_ceil(mss)
    } else {
        1
    }
}
