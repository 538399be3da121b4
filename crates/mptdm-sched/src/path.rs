//! Per-path state read by the scheduler.
//!
//! A [`Path`] is a snapshot of one subflow maintained by the host transport.
//! The scheduler only reads it, except for the quota which it owns.

use crate::error::Error;
use std::fmt;

/// Maximum number of paths in one connection (one bit each in a `u32` mask).
pub const MAX_PATHS: u8 = 32;

/// Default maximum segment size for a new path.
pub const DEFAULT_MSS: u32 = 1460;

/// Stable 1-based identifier of a path within a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathIndex(u8);

impl PathIndex {
    /// Create an index, rejecting 0 and anything above [`MAX_PATHS`].
    pub fn new(index: u8) -> Result<Self, Error> {
        if index == 0 || index > MAX_PATHS {
            return Err(Error::Path(format!(
                "path index {} out of range 1..={}",
                index, MAX_PATHS
            )));
        }
        Ok(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Bit for this path in a [`PathMask`](crate::segment::PathMask).
    pub(crate) fn flag(self) -> u32 {
        1 << (self.0 - 1)
    }
}

impl fmt::Display for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection state of a subflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubflowState {
    SynSent,
    SynRecv,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
    Close,
}

impl SubflowState {
    /// States in which new payload may be queued on the subflow.
    pub fn can_send(self) -> bool {
        matches!(self, SubflowState::Established | SubflowState::CloseWait)
    }
}

/// Congestion-control state of a subflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaState {
    Open,
    Disorder,
    Cwr,
    Recovery,
    Loss,
}

/// Snapshot of one subflow.
#[derive(Debug, Clone)]
pub struct Path {
    index: PathIndex,

    /// Recorded TDM slot. Must equal `index - 1`.
    pub curr_tdn: u8,

    /// Subflow connection state.
    pub state: SubflowState,

    /// Handshake not yet confirmed for data.
    pub pre_established: bool,

    /// Final handshake ACK received.
    pub fully_established: bool,

    /// Potentially failed.
    pub pf: bool,

    /// Congestion-control state.
    pub ca_state: CaState,

    /// Loss detection uses selective acknowledgments.
    pub sack: bool,

    /// Oldest unacknowledged sequence.
    pub snd_una: u32,

    /// Next sequence to transmit.
    pub snd_nxt: u32,

    /// End of the data queued on this subflow.
    pub write_seq: u32,

    /// `snd_nxt` at the moment loss was declared.
    pub high_seq: u32,

    /// Receiver's advertised window in bytes.
    pub snd_wnd: u32,

    /// Segments sent and not yet acknowledged.
    pub packets_out: u32,

    /// Segments selectively acknowledged.
    pub sacked_out: u32,

    /// Segments marked lost.
    pub lost_out: u32,

    /// Segments retransmitted and not yet acknowledged.
    pub retrans_out: u32,

    /// Congestion window in segments.
    pub snd_cwnd: u32,

    /// Current maximum segment size in bytes.
    pub mss: u32,

    /// A second data packet has been sent on this subflow.
    pub second_packet: bool,

    /// Data sequence following the last segment queued here.
    pub last_end_data_seq: u32,

    pub(crate) quota: u32,
}

impl Path {
    /// Create an established, idle path with a large window.
    pub fn new(index: PathIndex) -> Self {
        Self {
            index,
            curr_tdn: index.get() - 1,
            state: SubflowState::Established,
            pre_established: false,
            fully_established: true,
            pf: false,
            ca_state: CaState::Open,
            sack: true,
            snd_una: 0,
            snd_nxt: 0,
            write_seq: 0,
            high_seq: 0,
            snd_wnd: u32::MAX / 2,
            packets_out: 0,
            sacked_out: 0,
            lost_out: 0,
            retrans_out: 0,
            snd_cwnd: 10,
            mss: DEFAULT_MSS,
            second_packet: false,
            last_end_data_seq: 0,
            quota: 0,
        }
    }

    /// Set the maximum segment size.
    pub fn with_mss(mut self, mss: u32) -> Self {
        self.mss = mss;
        self
    }

    /// Set the congestion window (in segments).
    pub fn with_cwnd(mut self, snd_cwnd: u32) -> Self {
        self.snd_cwnd = snd_cwnd;
        self
    }

    /// Identity of this path, fixed for its lifetime.
    pub fn index(&self) -> PathIndex {
        self.index
    }

    /// MSS units granted to this path in the current round.
    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Segments currently in the network.
    pub fn packets_in_flight(&self) -> u32 {
        self.packets_out
            .saturating_sub(self.sacked_out.saturating_add(self.lost_out))
            .saturating_add(self.retrans_out)
    }

    /// Right edge of the receiver's window.
    pub fn wnd_end(&self) -> u32 {
        self.snd_una.wrapping_add(self.snd_wnd)
    }

    /// Bytes queued on this subflow but not yet transmitted.
    pub fn unsent_bytes(&self) -> u32 {
        self.write_seq.wrapping_sub(self.snd_nxt)
    }
}

/// `a` comes strictly before `b` in 32-bit sequence space.
pub fn before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}
