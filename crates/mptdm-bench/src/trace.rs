//! Simulated host transport driving the scheduler.

use crate::{LogEvent, LogWriter};
use mptdm_sched::{
    Config, Connection, MultipathScheduler, Path, PathIndex, Scheduled, Segment, SegmentSource,
    TdmScheduler, Tunables,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shape of the simulated connection and traffic.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub paths: u8,
    pub segments: u32,
    pub segment_len: u32,
    pub max_segment_len: Option<u32>,
    pub seed: Option<u64>,
    pub mss: u32,
    pub cwnd: u32,
    pub ack_every: u32,
    pub reinject_every: u32,
}

/// What one path carried during a trace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathTotals {
    pub segments: u64,
    pub bytes: u64,
    pub reinjected: u64,
}

/// Run a trace, logging every decision. Returns totals indexed by path
/// index - 1.
pub fn run(
    options: &TraceOptions,
    config: Config,
    log_path: &str,
) -> Result<Vec<PathTotals>, Box<dyn std::error::Error>> {
    if options.paths == 0 {
        return Err("at least one path is required".into());
    }

    let mut log = LogWriter::open(log_path)?;
    let mut conn = build_connection(options)?;
    let sched = TdmScheduler::new(Tunables::new(config)?);

    let mut event = LogEvent::new("start");
    event.burst_size = Some(config.burst_size);
    event.cwnd_limited = Some(config.cwnd_limited);
    log.log(&event);

    let mut totals = vec![PathTotals::default(); usize::from(options.paths)];
    let mut sent = 0u64;
    let mut step = 0u64;
    let mut idle = 0u32;

    while !conn.send_queue().is_empty() || !conn.reinject_queue().is_empty() {
        step += 1;

        match sched.next_segment(&mut conn) {
            Some(scheduled) => {
                idle = 0;
                let segment = transmit(&mut conn, &scheduled)?;
                sent += 1;

                let total = &mut totals[usize::from(scheduled.path.get() - 1)];
                total.segments += 1;
                total.bytes += u64::from(segment.len);
                if scheduled.source == SegmentSource::Reinject {
                    total.reinjected += 1;
                }

                let mut event = LogEvent::new("schedule");
                event.step = Some(step);
                event.path = Some(scheduled.path.get());
                event.seq = Some(segment.seq);
                event.len = Some(segment.len);
                event.source = Some(source_label(scheduled.source).to_string());
                event.limit = Some(scheduled.limit);
                event.quota = conn.path(scheduled.path).map(Path::quota);
                log.log(&event);

                if options.reinject_every > 0
                    && scheduled.source == SegmentSource::Send
                    && sent % u64::from(options.reinject_every) == 0
                {
                    conn.push_reinject(segment);
                }
                if options.ack_every == 0 {
                    ack_all(&mut conn);
                }
            }
            None => {
                idle += 1;
                let mut event = LogEvent::new("idle");
                event.step = Some(step);
                log.log(&event);

                // Nothing in flight and still no path: no path will ever open.
                if idle > 1 {
                    tracing::warn!(
                        "no path available with {} segments queued, stopping",
                        conn.send_queue().len() + conn.reinject_queue().len()
                    );
                    break;
                }
                ack_all(&mut conn);
            }
        }

        if options.ack_every > 0 && step % u64::from(options.ack_every) == 0 {
            ack_all(&mut conn);
        }
    }

    let mut event = LogEvent::new("done");
    event.step = Some(step);
    log.log(&event);

    for (i, total) in totals.iter().enumerate() {
        println!(
            "path {}: segments={} bytes={} reinjected={}",
            i + 1,
            total.segments,
            total.bytes,
            total.reinjected
        );
    }

    Ok(totals)
}

fn build_connection(options: &TraceOptions) -> Result<Connection, Box<dyn std::error::Error>> {
    let mut conn = Connection::new();
    for i in 1..=options.paths {
        let path = Path::new(PathIndex::new(i)?)
            .with_mss(options.mss)
            .with_cwnd(options.cwnd);
        conn.add_path(path)?;
    }

    let mut rng = match options.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut seq = 0u32;
    for _ in 0..options.segments {
        let len = match options.max_segment_len {
            Some(max) => rng.gen_range(1..=max.max(1)),
            None => options.segment_len,
        };
        conn.push_send(Segment::new(seq, len));
        seq = seq.wrapping_add(len);
    }

    tracing::debug!(
        "built connection with {} paths and {} segments",
        options.paths,
        options.segments
    );
    Ok(conn)
}

/// Take the scheduled segment off its queue and account for it on its path.
fn transmit(
    conn: &mut Connection,
    scheduled: &Scheduled,
) -> Result<Segment, Box<dyn std::error::Error>> {
    let mut segment = conn
        .dequeue(scheduled.source)
        .ok_or("scheduled segment missing from its queue")?;
    segment.mark_sent_on(scheduled.path);

    let path = conn
        .path_mut(scheduled.path)
        .ok_or("scheduled path missing from connection")?;
    path.packets_out += segment.len.div_ceil(path.mss.max(1)).max(1);
    path.write_seq = path.write_seq.wrapping_add(segment.len);
    path.snd_nxt = path.write_seq;
    path.last_end_data_seq = segment.end_seq();
    path.second_packet = true;

    Ok(segment)
}

fn ack_all(conn: &mut Connection) {
    for path in conn.paths_mut() {
        path.snd_una = path.snd_nxt;
        path.packets_out = 0;
        path.sacked_out = 0;
        path.lost_out = 0;
        path.retrans_out = 0;
    }
}

fn source_label(source: SegmentSource) -> &'static str {
    match source {
        SegmentSource::Send => "send",
        SegmentSource::Reinject => "reinject",
    }
}
