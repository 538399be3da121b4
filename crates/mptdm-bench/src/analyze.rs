//! Trace log analysis.
//!
//! Reads a JSONL log written by `trace` and reports how evenly the paths
//! were served.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Event from a trace log file.
#[derive(Deserialize, Debug)]
struct LogEvent {
    event: Option<String>,
    step: Option<u64>,
    path: Option<u8>,
    len: Option<u32>,
    source: Option<String>,
}

/// Load all events from a JSONL file.
fn load_events(path: &Path) -> Result<Vec<LogEvent>, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Ok(event) = serde_json::from_str::<LogEvent>(&line) {
            events.push(event);
        }
    }
    Ok(events)
}

/// How one path was served over a trace.
#[derive(Debug, Default, Clone, PartialEq)]
struct PathShare {
    segments: u64,
    bytes: u64,
    share: f64,
    bursts: u64,
    longest_burst: u64,
    longest_burst_step: Option<u64>,
}

/// Per-path totals over first transmissions; reinjections are not part of
/// the round robin and are left out.
fn fairness(events: &[LogEvent]) -> BTreeMap<u8, PathShare> {
    let mut shares: BTreeMap<u8, PathShare> = BTreeMap::new();
    // Path of the run in progress, its length and the step it began at.
    let mut current: Option<(u8, u64, Option<u64>)> = None;

    let scheduled = events.iter().filter(|e| {
        e.event.as_deref() == Some("schedule") && e.source.as_deref() == Some("send")
    });
    for event in scheduled {
        let Some(path) = event.path else {
            continue;
        };
        let entry = shares.entry(path).or_default();
        entry.segments += 1;
        entry.bytes += u64::from(event.len.unwrap_or(0));

        let (run, start) = match current {
            Some((last, run, start)) if last == path => (run + 1, start),
            _ => {
                entry.bursts += 1;
                (1, event.step)
            }
        };
        if run > entry.longest_burst {
            entry.longest_burst = run;
            entry.longest_burst_step = start;
        }
        current = Some((path, run, start));
    }

    let total: u64 = shares.values().map(|share| share.bytes).sum();
    if total > 0 {
        for share in shares.values_mut() {
            share.share = share.bytes as f64 / total as f64;
        }
    }
    shares
}

/// Print the fairness report, optionally enforcing a minimum byte share.
pub fn run_fairness(log: &Path, min_share: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let events = load_events(log)?;
    if !events.iter().any(|e| e.event.as_deref() == Some("done")) {
        tracing::warn!("trace log {} has no done event", log.display());
    }

    let shares = fairness(&events);
    if shares.is_empty() {
        return Err("no scheduled segments in trace log".into());
    }

    for (path, share) in &shares {
        let at = share
            .longest_burst_step
            .map(|step| format!(" (from step {})", step))
            .unwrap_or_default();
        println!(
            "path {}: segments={} bytes={} share={:.3} bursts={} longest_burst={}{}",
            path,
            share.segments,
            share.bytes,
            share.share,
            share.bursts,
            share.longest_burst,
            at
        );
    }

    if let Some(min) = min_share {
        for (path, share) in &shares {
            if share.share < min {
                return Err(format!(
                    "path {} share {:.3} < minimum {:.3}",
                    path, share.share, min
                )
                .into());
            }
        }
        println!("share minimum ok (>= {:.3})", min);
    }

    Ok(())
}
