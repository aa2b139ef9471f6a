use super::{AckReaction, CcState, CongestionControl, TimeoutReaction};
use crate::consts::RENO_INITIAL_SSTHRESH;
use crate::segment::Segment;
use log::debug;
use std::time::Duration;

/// TCP Reno: slow start, additive increase in congestion avoidance, fast
/// retransmit on the third duplicate ack and multiplicative backoff on
/// timeout.
#[derive(Debug)]
pub struct Reno {
    cwnd: f64,
    ssthresh: u32,
    state: CcState,
}

impl Reno {
    pub fn new() -> Self {
        Self {
            cwnd: 1.0,
            ssthresh: RENO_INITIAL_SSTHRESH,
            state: CcState::SlowStart,
        }
    }

    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    /// Timeout backoff: remember half the window, collapse to one segment.
    fn backoff(&mut self) {
        self.ssthresh = ((self.cwnd / 2.0).floor() as u32).max(1);
        self.cwnd = 1.0;
        self.state = CcState::Timeout;
        debug!("timeout backoff: cwnd 1, ssthresh {}", self.ssthresh);
    }
}

impl Default for Reno {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionControl for Reno {
    fn cwnd(&self) -> f64 {
        self.cwnd
    }

    fn state(&self) -> CcState {
        self.state
    }

    fn on_eof(&mut self) {
        self.state = CcState::SendingEof;
    }

    fn before_send(&mut self, _segment: &mut Segment) {
        if self.state == CcState::Timeout {
            self.state = CcState::SlowStart;
        }
    }

    fn on_segment_acked(&mut self, _segment: &Segment, _sample: Duration) {
        match self.state {
            CcState::SlowStart => self.cwnd += 1.0,
            // Stevens-style additive increase plus a 1/8 segment kicker.
            CcState::CongestionAvoidance => self.cwnd += 1.0 / self.cwnd + 0.125,
            _ => {}
        }
    }

    fn on_duplicate_ack(&mut self, count: u32) -> AckReaction {
        if count != 3 {
            return AckReaction::Ignore;
        }
        self.ssthresh = ((self.cwnd / 2.0).floor() as u32).max(1);
        self.cwnd = f64::from(self.ssthresh);
        self.state = CcState::CongestionAvoidance;
        debug!("fast retransmit: cwnd {}, ssthresh {}", self.cwnd, self.ssthresh);
        AckReaction::FastRetransmit
    }

    fn on_recv_timeout(&mut self) -> TimeoutReaction {
        self.backoff();
        TimeoutReaction::Rearm
    }

    fn on_head_timeout(&mut self, _head: &Segment) -> TimeoutReaction {
        self.backoff();
        TimeoutReaction::Rearm
    }

    fn on_tick_end(&mut self) {
        // Integer-tick growth: a fraction within 0.1 of the next whole
        // number rounds up.
        if (self.cwnd + 0.1).floor() > self.cwnd.floor() {
            self.cwnd = (self.cwnd + 0.1).floor();
        }
        if self.state == CcState::SlowStart && self.cwnd >= f64::from(self.ssthresh) {
            self.cwnd = f64::from(self.ssthresh);
            self.state = CcState::CongestionAvoidance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn segment() -> Segment {
        Segment::new(0, Bytes::from_static(&[0u8; 16]))
    }

    fn ack(reno: &mut Reno, times: u32) {
        for _ in 0..times {
            reno.on_segment_acked(&segment(), Duration::from_millis(10));
        }
    }

    #[test]
    fn test_slow_start_grows_per_acked_segment() {
        let mut reno = Reno::new();
        ack(&mut reno, 4);
        assert_eq!(reno.cwnd(), 5.0);
        assert_eq!(reno.state(), CcState::SlowStart);
    }

    #[test]
    fn test_slow_start_snaps_to_ssthresh() {
        let mut reno = Reno::new();
        ack(&mut reno, 70);
        reno.on_tick_end();
        assert_eq!(reno.cwnd(), 64.0);
        assert_eq!(reno.state(), CcState::CongestionAvoidance);
    }

    #[test]
    fn test_congestion_avoidance_growth() {
        let mut reno = Reno::new();
        ack(&mut reno, 9); // cwnd 10
        assert_eq!(reno.on_duplicate_ack(1), AckReaction::Ignore);
        assert_eq!(reno.on_duplicate_ack(2), AckReaction::Ignore);
        // The third duplicate halves into congestion avoidance.
        assert_eq!(reno.on_duplicate_ack(3), AckReaction::FastRetransmit);
        assert_eq!(reno.ssthresh(), 5);
        assert_eq!(reno.cwnd(), 5.0);
        assert_eq!(reno.state(), CcState::CongestionAvoidance);

        let mut expected = 5.0f64;
        ack(&mut reno, 3);
        for _ in 0..3 {
            expected += 1.0 / expected + 0.125;
        }
        assert!((reno.cwnd() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_early_duplicates_are_ignored() {
        let mut reno = Reno::new();
        assert_eq!(reno.on_duplicate_ack(1), AckReaction::Ignore);
        assert_eq!(reno.on_duplicate_ack(2), AckReaction::Ignore);
        assert_eq!(reno.state(), CcState::SlowStart);
    }

    #[test]
    fn test_tick_end_rounds_near_integers_up() {
        let mut reno = Reno::new();
        ack(&mut reno, 9);
        reno.on_duplicate_ack(3); // cwnd 5.0, congestion avoidance

        let mut expected = 5.0f64;
        for _ in 0..3 {
            ack(&mut reno, 1);
            expected += 1.0 / expected + 0.125;
        }
        // 5.0 -> 5.325 -> 5.638 -> 5.940, which the tick rounds to 6.
        assert!((reno.cwnd() - expected).abs() < 1e-12);
        reno.on_tick_end();
        assert_eq!(reno.cwnd(), 6.0);
    }

    #[test]
    fn test_timeout_backoff_and_rearm() {
        let mut reno = Reno::new();
        ack(&mut reno, 9); // cwnd 10
        assert_eq!(reno.on_recv_timeout(), TimeoutReaction::Rearm);
        assert_eq!(reno.cwnd(), 1.0);
        assert_eq!(reno.ssthresh(), 5);
        assert_eq!(reno.state(), CcState::Timeout);

        // The first re-send leaves the timeout phase.
        let mut head = segment();
        reno.before_send(&mut head);
        assert_eq!(reno.state(), CcState::SlowStart);
    }

    #[test]
    fn test_head_timeout_matches_recv_timeout_law() {
        let mut reno = Reno::new();
        ack(&mut reno, 5); // cwnd 6
        assert_eq!(reno.on_head_timeout(&segment()), TimeoutReaction::Rearm);
        assert_eq!(reno.cwnd(), 1.0);
        assert_eq!(reno.ssthresh(), 3);
    }

    #[test]
    fn test_ssthresh_floor_is_one() {
        let mut reno = Reno::new();
        reno.on_recv_timeout();
        assert_eq!(reno.ssthresh(), 1);
        assert_eq!(reno.cwnd(), 1.0);
    }
}
