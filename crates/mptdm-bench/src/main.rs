//! Trace harness for the TDM path scheduler.
//!
//! Plays the host transport around a simulated multipath connection: it asks
//! the scheduler for a decision on every transmission opportunity, hands the
//! segment to the chosen path, acknowledges data and reinjects some of it.
//! Every decision is written to a JSONL log that `fairness` can analyze.

mod analyze;
mod trace;

use clap::{Parser, Subcommand};
use mptdm_sched::Config;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Trace harness for the TDM path scheduler.
#[derive(Parser, Debug)]
#[command(name = "mptdm-bench", about = "TDM scheduler trace harness")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the scheduler over a simulated connection
    Trace {
        /// Number of paths
        #[arg(long, default_value = "2")]
        paths: u8,

        /// Number of segments to send
        #[arg(long, default_value = "100")]
        segments: u32,

        /// Segment length in bytes
        #[arg(long, default_value = "1460")]
        segment_len: u32,

        /// Draw segment lengths uniformly from 1..=N instead
        #[arg(long)]
        max_segment_len: Option<u32>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum segment size of every path
        #[arg(long, default_value = "1460")]
        mss: u32,

        /// Congestion window of every path, in segments
        #[arg(long, default_value = "10")]
        cwnd: u32,

        /// Burst size in MSS units (overrides --config)
        #[arg(long)]
        burst_size: Option<u32>,

        /// Enforce the cwnd test in the round-robin scan (overrides --config)
        #[arg(long)]
        cwnd_limited: Option<bool>,

        /// JSON scheduler config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Acknowledge everything in flight every N opportunities (0 = after each send)
        #[arg(long, default_value = "0")]
        ack_every: u32,

        /// Reinject every Nth sent segment (0 disables reinjection)
        #[arg(long, default_value = "0")]
        reinject_every: u32,

        /// Log file path (use - for stdout)
        #[arg(long, default_value = "-")]
        log: String,
    },

    /// Report per-path share and burst lengths from a trace log
    Fairness {
        /// Path to the trace log
        #[arg(long)]
        log: PathBuf,

        /// Fail if any path carried less than this share of bytes (0.0-1.0)
        #[arg(long)]
        min_share: Option<f64>,
    },
}

/// JSON log event.
#[derive(serde::Serialize)]
struct LogEvent {
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    len: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    burst_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwnd_limited: Option<bool>,
}

impl LogEvent {
    fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            step: None,
            path: None,
            seq: None,
            len: None,
            source: None,
            limit: None,
            quota: None,
            burst_size: None,
            cwnd_limited: None,
        }
    }
}

enum LogWriter {
    Stdout,
    File(std::fs::File),
}

impl LogWriter {
    fn open(path: &str) -> std::io::Result<Self> {
        if path == "-" {
            Ok(Self::Stdout)
        } else {
            Ok(Self::File(std::fs::File::create(path)?))
        }
    }

    fn log(&mut self, event: &LogEvent) {
        let line = serde_json::to_string(event).unwrap_or_default();
        match self {
            Self::Stdout => {
                println!("{}", line);
            }
            Self::File(f) => {
                let _ = writeln!(f, "{}", line);
                let _ = f.flush();
            }
        }
    }
}

fn load_config(
    path: Option<&PathBuf>,
    burst_size: Option<u32>,
    cwnd_limited: Option<bool>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(burst_size) = burst_size {
        config = config.with_burst_size(burst_size);
    }
    if let Some(cwnd_limited) = cwnd_limited {
        config = config.with_cwnd_limited(cwnd_limited);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let args = Args::parse();

    match args.command {
        Command::Trace {
            paths,
            segments,
            segment_len,
            max_segment_len,
            seed,
            mss,
            cwnd,
            burst_size,
            cwnd_limited,
            config,
            ack_every,
            reinject_every,
            log,
        } => {
            let config = load_config(config.as_ref(), burst_size, cwnd_limited)?;
            let options = trace::TraceOptions {
                paths,
                segments,
                segment_len,
                max_segment_len,
                seed,
                mss,
                cwnd,
                ack_every,
                reinject_every,
            };
            trace::run(&options, config, &log)?;
        }
        Command::Fairness { log, min_share } => {
            analyze::run_fairness(&log, min_share)?;
        }
    }

    Ok(())
}
