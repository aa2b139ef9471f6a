//! Congestion-control capability shared by the windowed senders.

mod fixed;
mod reno;
mod vegas;

pub use fixed::FixedWindow;
pub use reno::Reno;
pub use vegas::{ProbePhase, Vegas};

use crate::rtt::RttEstimator;
use crate::segment::Segment;
use std::time::Duration;

/// Controller-owned phase of a transfer.
///
/// The declaration order matters: refill and shutdown checks compare phases,
/// with `Timeout` below the data phases and the EOF phases above them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CcState {
    Timeout,
    Evaluation,
    SlowStart,
    CongestionAvoidance,
    SendingEof,
    SendingFinack,
}

/// Verdict on a duplicate acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckReaction {
    Ignore,
    /// Re-arm the window and drain stale acknowledgements from the socket.
    FastRetransmit,
}

/// Verdict on a receive timeout or an aged head segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReaction {
    /// Nothing to do, or the variant's heuristic chose to stand pat.
    Ignore,
    /// Re-arm every window segment for retransmission.
    Rearm,
}

/// Capability implemented by each congestion-control variant.
///
/// The driver owns the window, the socket and the RTT estimator; a
/// controller owns `cwnd` and the transfer phase and reacts to the events
/// below. Hooks default to no-ops so a variant only spells out the laws it
/// actually has.
pub trait CongestionControl {
    /// Current congestion window. Capacity checks truncate to whole segments.
    fn cwnd(&self) -> f64;

    fn state(&self) -> CcState;

    /// The input stream is exhausted; no further segments will be created.
    fn on_eof(&mut self);

    /// Window capacity in whole segments.
    fn window_limit(&self) -> usize {
        self.cwnd() as usize
    }

    /// The window emptied in the EOF phase, just before FINACK goes out.
    fn on_window_drained(&mut self) {}

    /// True when a receive timeout means the transfer is complete.
    fn done_on_recv_timeout(&self) -> bool {
        self.state() >= CcState::SendingEof
    }

    /// Called immediately before a segment is emitted, fresh or re-send.
    fn before_send(&mut self, _segment: &mut Segment) {}

    /// A fresh cumulative ack arrived; called once before removals.
    fn on_new_ack(&mut self, _sample: Duration, _rtt: &RttEstimator) {}

    /// One segment left the window under a fresh cumulative ack.
    fn on_segment_acked(&mut self, _segment: &Segment, _sample: Duration) {}

    /// The peer repeated its last acknowledgement `count` times in a row.
    fn on_duplicate_ack(&mut self, _count: u32) -> AckReaction {
        AckReaction::Ignore
    }

    /// The receive call hit its ceiling with the transfer still in progress.
    fn on_recv_timeout(&mut self) -> TimeoutReaction {
        TimeoutReaction::Ignore
    }

    /// The head segment has been in flight longer than the current timeout.
    fn on_head_timeout(&mut self, _head: &Segment) -> TimeoutReaction {
        TimeoutReaction::Ignore
    }

    /// End of one driver iteration.
    fn on_tick_end(&mut self) {}
}
