//! Subflow selection for reinjections and generic lookups.

use crate::availability::{is_available, must_skip_for_reinjection};
use crate::connection::MetaState;
use crate::diag::{Diagnostics, SchedEvent};
use crate::path::{Path, PathIndex};
use crate::segment::Segment;

/// Pick any available path for `segment`.
///
/// A data-fin answering the peer's shutdown stays on the path the peer's
/// data-fin came in on. Otherwise the last available path the segment has
/// not been queued on wins. If the segment has been queued on every
/// available path, its path mask is cleared and the last of them is used.
pub fn select_subflow(
    meta: &MetaState,
    paths: &[Path],
    mut segment: Option<&mut Segment>,
    zero_window_test: bool,
    diag: &dyn Diagnostics,
) -> Option<PathIndex> {
    let data_fin = segment.as_deref().is_some_and(|segment| segment.data_fin);
    if meta.rcv_shutdown && data_fin {
        if let Some(dfin_path) = meta.dfin_path_index {
            let found = paths.iter().find(|path| {
                path.index() == dfin_path
                    && is_available(path, segment.as_deref(), zero_window_test, true, diag)
            });
            if let Some(path) = found {
                return Some(path.index());
            }
        }
    }

    let mut best = None;
    let mut backup = None;
    for path in paths {
        let candidate = segment.as_deref();
        if !is_available(path, candidate, zero_window_test, true, diag) {
            continue;
        }

        if must_skip_for_reinjection(path, candidate) {
            backup = Some(path.index());
            continue;
        }

        best = Some(path.index());
    }

    if best.is_some() {
        return best;
    }

    let backup = backup?;
    if let Some(segment) = segment.as_deref_mut() {
        segment.path_mask.clear();
        diag.emit(SchedEvent::MaskForgiven {
            seq: segment.seq,
            path: backup,
        });
    }
    Some(backup)
}
