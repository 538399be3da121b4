//! Path eligibility checks.

use crate::diag::{Diagnostics, SchedEvent};
use crate::path::{before, CaState, Path};
use crate::segment::Segment;

/// Is `path` allowed to carry `segment` right now?
///
/// The checks run in a fixed order and stop at the first failure; later
/// checks rely on the earlier ones having passed. With `cwnd_test` the path
/// must have room in its congestion window, with `zero_window_test` the
/// receiver's window must not be exhausted.
pub fn is_available(
    path: &Path,
    segment: Option<&Segment>,
    zero_window_test: bool,
    cwnd_test: bool,
    diag: &dyn Diagnostics,
) -> bool {
    if u32::from(path.curr_tdn) + 1 != u32::from(path.index().get()) {
        diag.emit(SchedEvent::IndexMismatch {
            path: path.index(),
            curr_tdn: path.curr_tdn,
        });
        return false;
    }

    if !path.state.can_send() {
        return false;
    }

    // No data until the final handshake ACK has been received.
    if path.pre_established {
        return false;
    }

    if path.pf {
        return false;
    }

    // Without SACK the subflow stays in loss state until something above
    // high_seq is acked, so nothing new is pushed once snd_una moved.
    if path.ca_state == CaState::Loss && !path.sack && path.snd_una != path.high_seq {
        return false;
    }

    if !path.fully_established {
        // Keep the data in order until the subflow is fully established.
        if let Some(segment) = segment {
            if path.second_packet && path.last_end_data_seq != segment.seq {
                return false;
            }
        }
    }

    if cwnd_test {
        let in_flight = path.packets_in_flight();
        if in_flight >= path.snd_cwnd {
            return false;
        }

        // What is already queued on the subflow may fill the window.
        let space = (path.snd_cwnd - in_flight).saturating_mul(path.mss);
        if path.unsent_bytes() > space {
            return false;
        }
    }

    if zero_window_test && !before(path.write_seq, path.wnd_end()) {
        return false;
    }

    true
}

/// Has `segment` already been queued on `path`?
///
/// Such a path is a poor target for a reinjection.
pub fn must_skip_for_reinjection(path: &Path, segment: Option<&Segment>) -> bool {
    segment.is_some_and(|segment| segment.path_mask.contains(path.index()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Recorder;
    use crate::path::{PathIndex, SubflowState};

    fn path() -> Path {
        Path::new(PathIndex::new(2).unwrap()).with_mss(1000).with_cwnd(4)
    }

    fn check(path: &Path, segment: Option<&Segment>, zwt: bool, cwnd: bool) -> bool {
        is_available(path, segment, zwt, cwnd, &Recorder::new())
    }

    #[test]
    fn fresh_path_is_available() {
        assert!(check(&path(), None, true, true));
    }

    #[test]
    fn index_mismatch_reported() {
        let mut p = path();
        p.curr_tdn = 0;
        let recorder = Recorder::new();
        assert!(!is_available(&p, None, false, false, &recorder));
        assert_eq!(
            recorder.drain(),
            vec![SchedEvent::IndexMismatch {
                path: p.index(),
                curr_tdn: 0
            }]
        );
    }

    #[test]
    fn mismatch_checked_before_anything_else() {
        let mut p = path();
        p.curr_tdn = 7;
        p.state = SubflowState::Close;
        let recorder = Recorder::new();
        assert!(!is_available(&p, None, false, false, &recorder));
        assert_eq!(recorder.drain().len(), 1);
    }

    #[test]
    fn state_flags() {
        let mut p = path();
        p.state = SubflowState::SynSent;
        assert!(!check(&p, None, false, false));
        p.state = SubflowState::CloseWait;
        assert!(check(&p, None, false, false));

        let mut p = path();
        p.pre_established = true;
        assert!(!check(&p, None, false, false));

        let mut p = path();
        p.pf = true;
        assert!(!check(&p, None, false, false));
    }

    #[test]
    fn loss_state() {
        let mut p = path();
        p.ca_state = CaState::Loss;
        p.snd_una = 100;
        p.high_seq = 200;
        // SACK paths stay usable.
        assert!(check(&p, None, false, false));

        p.sack = false;
        assert!(!check(&p, None, false, false));
        p.snd_una = 200;
        assert!(check(&p, None, false, false));
    }

    #[test]
    fn in_order_until_fully_established() {
        let mut p = path();
        p.fully_established = false;
        p.second_packet = true;
        p.last_end_data_seq = 500;

        assert!(check(&p, Some(&Segment::new(500, 10)), false, false));
        assert!(!check(&p, Some(&Segment::new(600, 10)), false, false));
        assert!(check(&p, None, false, false));

        p.second_packet = false;
        assert!(check(&p, Some(&Segment::new(600, 10)), false, false));
    }

    #[test]
    fn cwnd_test() {
        let mut p = path();
        p.packets_out = 4;
        assert!(!check(&p, None, false, true));
        assert!(check(&p, None, false, false));

        // One free slot of 1000 bytes.
        p.packets_out = 3;
        p.write_seq = 1000;
        assert!(check(&p, None, false, true));
        p.write_seq = 1001;
        assert!(!check(&p, None, false, true));
    }

    #[test]
    fn zero_window_test() {
        let mut p = path();
        p.snd_una = 0;
        p.snd_wnd = 3000;
        p.write_seq = 2999;
        p.snd_nxt = 2999;
        assert!(check(&p, None, true, false));
        p.write_seq = 3000;
        p.snd_nxt = 3000;
        assert!(!check(&p, None, true, false));
        assert!(check(&p, None, false, false));
    }

    #[test]
    fn reinjection_gate() {
        let p = path();
        let mut segment = Segment::new(0, 10);
        assert!(!must_skip_for_reinjection(&p, None));
        assert!(!must_skip_for_reinjection(&p, Some(&segment)));

        segment.mark_sent_on(PathIndex::new(1).unwrap());
        assert!(!must_skip_for_reinjection(&p, Some(&segment)));

        segment.mark_sent_on(p.index());
        assert!(must_skip_for_reinjection(&p, Some(&segment)));
    }
}
