use mptdm_sched::{
    Config, Connection, MultipathScheduler, Path, PathIndex, Recorder, SchedEvent, Scheduled,
    SchedulerRegistry, Segment, SegmentSource, TdmScheduler, Tunables,
};
use std::sync::Arc;
use std::thread;

const MSS: u32 = 1000;

fn idx(index: u8) -> PathIndex {
    PathIndex::new(index).unwrap()
}

fn tdm(burst_size: u32, cwnd_limited: bool) -> TdmScheduler {
    let config = Config::new()
        .with_burst_size(burst_size)
        .with_cwnd_limited(cwnd_limited);
    TdmScheduler::new(Tunables::new(config).unwrap())
}

fn connection(paths: u8) -> Connection {
    let mut conn = Connection::new();
    for i in 1..=paths {
        conn.add_path(Path::new(idx(i)).with_mss(MSS).with_cwnd(100))
            .unwrap();
    }
    conn
}

/// Acts like the host: hand the segment to its path and pop it.
fn transmit(conn: &mut Connection, scheduled: &Scheduled) {
    let mut segment = conn.dequeue(scheduled.source).unwrap();
    assert_eq!(segment.seq, scheduled.segment.seq);
    segment.mark_sent_on(scheduled.path);
}

/// Schedule and transmit until nothing is left, returning the path indices.
fn drain(sched: &TdmScheduler, conn: &mut Connection) -> Vec<u8> {
    let mut sequence = Vec::new();
    while let Some(scheduled) = sched.next_segment(conn) {
        transmit(conn, &scheduled);
        sequence.push(scheduled.path.get());
    }
    sequence
}

fn quota(conn: &Connection, index: u8) -> u32 {
    conn.path(idx(index)).unwrap().quota()
}

#[test]
fn two_paths_one_wraparound() {
    let sched = tdm(2, false);
    let mut conn = connection(2);
    for n in 0..5 {
        conn.push_send(Segment::new(n * MSS, MSS));
    }

    let mut sequence = Vec::new();
    let mut limits = Vec::new();
    while let Some(scheduled) = sched.next_segment(&mut conn) {
        transmit(&mut conn, &scheduled);
        sequence.push(scheduled.path.get());
        limits.push(scheduled.limit);
    }

    assert_eq!(sequence, vec![1, 1, 2, 2, 1]);
    assert_eq!(limits, vec![2 * MSS, MSS, 2 * MSS, MSS, 2 * MSS]);
    assert_eq!(quota(&conn, 1), 1);
    assert_eq!(quota(&conn, 2), 0);
}

#[test]
fn wraparound_never_starves() {
    let sched = tdm(3, true);
    let mut conn = connection(3);
    for n in 0..90 {
        conn.push_send(Segment::new(n * MSS, MSS));
    }

    let sequence = drain(&sched, &mut conn);
    assert_eq!(sequence.len(), 90);
    for index in 1..=3 {
        assert_eq!(sequence.iter().filter(|&&p| p == index).count(), 30);
    }
    // Bursts are exactly three segments long.
    for burst in sequence.chunks(3) {
        assert!(burst.iter().all(|&p| p == burst[0]));
    }
}

#[test]
fn quota_monotonic_within_burst() {
    let sched = tdm(10, true);
    let mut conn = connection(1);
    let mut seq = 0;
    for len in [MSS, 300, 2 * MSS + 1, MSS, 4 * MSS] {
        conn.push_send(Segment::new(seq, len));
        seq += len;
    }

    let mut last = 0;
    let mut observed = Vec::new();
    while let Some(scheduled) = sched.next_segment(&mut conn) {
        transmit(&mut conn, &scheduled);
        let now = quota(&conn, 1);
        assert!(now > last);
        observed.push(now);
        last = now;
    }
    // 1 + 1 + 3 + 1 + 4, the last segment overshooting the burst.
    assert_eq!(observed, vec![1, 2, 5, 6, 10]);
}

#[test]
fn reinjection_bypasses_quota() {
    let sched = tdm(2, true);
    let mut conn = connection(2);
    conn.push_send(Segment::new(0, MSS));

    let first = sched.next_segment(&mut conn).unwrap();
    transmit(&mut conn, &first);
    assert_eq!(first.path, idx(1));

    let mut lost = first.segment;
    lost.mark_sent_on(first.path);
    conn.push_reinject(lost);
    conn.push_send(Segment::new(MSS, MSS));

    let retry = sched.next_segment(&mut conn).unwrap();
    assert_eq!(retry.source, SegmentSource::Reinject);
    assert_eq!(retry.path, idx(2));
    assert_eq!(retry.limit, 0);
    assert!(retry.byte_limit().is_none());
    assert_eq!(quota(&conn, 1), 1);
    assert_eq!(quota(&conn, 2), 0);
    transmit(&mut conn, &retry);

    // The burst on path 1 resumes.
    let next = sched.next_segment(&mut conn).unwrap();
    assert_eq!(next.source, SegmentSource::Send);
    assert_eq!(next.path, idx(1));
    assert_eq!(next.limit, MSS);
}

#[test]
fn data_fin_keeps_its_path() {
    let sched = tdm(10, true);
    let mut conn = connection(3);
    conn.meta_mut().rcv_shutdown = true;
    conn.meta_mut().dfin_path_index = Some(idx(2));

    let mut fin = Segment::new(5000, 0).with_data_fin();
    assert_eq!(sched.get_subflow(&conn, Some(&mut fin), false), Some(idx(2)));

    conn.push_reinject(fin);
    let scheduled = sched.next_segment(&mut conn).unwrap();
    assert_eq!(scheduled.path, idx(2));

    // Once the path is gone the fin goes anywhere.
    conn.remove_path(idx(2));
    assert_eq!(sched.get_subflow(&conn, Some(&mut fin), false), Some(idx(1)));
}

#[test]
fn segment_tried_everywhere_is_forgiven() {
    let recorder = Arc::new(Recorder::new());
    let sched = tdm(10, true).with_diagnostics(recorder.clone());
    let conn = connection(2);

    let mut segment = Segment::new(0, MSS);
    segment.mark_sent_on(idx(1));
    segment.mark_sent_on(idx(2));

    let path = sched.get_subflow(&conn, Some(&mut segment), false).unwrap();
    assert!(segment.path_mask.is_empty());
    assert_eq!(
        recorder.drain(),
        vec![SchedEvent::MaskForgiven { seq: 0, path }]
    );
}

#[test]
fn zero_window_only_checked_on_request() {
    let sched = tdm(10, true);
    let mut conn = connection(1);
    let path = conn.path_mut(idx(1)).unwrap();
    path.snd_una = 0;
    path.snd_wnd = 0;

    assert_eq!(sched.get_subflow(&conn, None, false), Some(idx(1)));
    assert_eq!(sched.get_subflow(&conn, None, true), None);
}

#[test]
fn shared_scheduler_across_threads() {
    let registry = SchedulerRegistry::with_builtin();
    let sched = registry.find("tdm").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sched = Arc::clone(&sched);
            thread::spawn(move || {
                let mut conn = connection(2);
                for n in 0..20 {
                    conn.push_send(Segment::new(n * MSS, MSS));
                }
                let mut sent = 0;
                while let Some(scheduled) = sched.next_segment(&mut conn) {
                    transmit(&mut conn, &scheduled);
                    sent += 1;
                }
                sent
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 20);
    }
}
