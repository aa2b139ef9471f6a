use super::{CcState, CongestionControl, TimeoutReaction};
use crate::consts::{MESSAGE_SIZE, VEGAS_ALPHA, VEGAS_BETA, VEGAS_DELTA, VEGAS_EPSILON};
use crate::rtt::RttEstimator;
use crate::segment::Segment;
use log::{debug, trace};
use std::time::Duration;

/// Phase of the rate probe carried by distinguished segments. The phase
/// toggles every time a new probe goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    /// Measure actual throughput over the probe segment's lifetime.
    Eval,
    /// Apply window adjustments from the previous measurement.
    Change,
}

/// TCP Vegas: throughput-delta window control. A single distinguished
/// segment per window anchors the actual-throughput measurement; expected
/// throughput derives from the base RTT.
#[derive(Debug)]
pub struct Vegas {
    cwnd: f64,
    state: CcState,
    probe: ProbePhase,
    distinguished_out: bool,
    distinguished_bytes: u64,
    expected_throughput: Option<f64>,
    actual_throughput: Option<f64>,
}

impl Vegas {
    pub fn new() -> Self {
        Self {
            cwnd: 1.0,
            state: CcState::SlowStart,
            probe: ProbePhase::Change,
            distinguished_out: false,
            distinguished_bytes: 0,
            expected_throughput: None,
            actual_throughput: None,
        }
    }

    pub fn probe(&self) -> ProbePhase {
        self.probe
    }

    pub fn expected_throughput(&self) -> Option<f64> {
        self.expected_throughput
    }

    pub fn actual_throughput(&self) -> Option<f64> {
        self.actual_throughput
    }
}

impl Default for Vegas {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionControl for Vegas {
    fn cwnd(&self) -> f64 {
        self.cwnd
    }

    fn state(&self) -> CcState {
        self.state
    }

    fn on_eof(&mut self) {
        self.state = CcState::SendingEof;
    }

    fn before_send(&mut self, segment: &mut Segment) {
        // A fresh segment becomes the probe anchor when none is outstanding.
        if !self.distinguished_out && segment.send_time.is_none() {
            segment.distinguished = true;
            self.distinguished_out = true;
            self.probe = match self.probe {
                ProbePhase::Change => ProbePhase::Eval,
                ProbePhase::Eval => ProbePhase::Change,
            };
            trace!("segment {} distinguished, probe {:?}", segment.seq_id, self.probe);
        }

        if self.state == CcState::Timeout {
            self.state = CcState::SlowStart;
            // Offset the retransmit that is counted below.
            self.distinguished_bytes =
                self.distinguished_bytes.saturating_sub(MESSAGE_SIZE as u64);
        }

        if segment.distinguished {
            self.distinguished_bytes = MESSAGE_SIZE as u64;
        } else {
            self.distinguished_bytes += segment.payload.len() as u64;
        }

        segment.sampled_rate = self.expected_throughput;
    }

    fn on_new_ack(&mut self, _sample: Duration, rtt: &RttEstimator) {
        if let Some(base) = rtt.base_rtt() {
            let expected = self.cwnd.floor() / base.as_secs_f64();
            self.expected_throughput = Some(expected);
            trace!(
                "expected throughput {:.4} (cwnd {}, base rtt {:?})",
                expected,
                self.cwnd.floor(),
                base
            );
        }
    }

    fn on_segment_acked(&mut self, segment: &Segment, sample: Duration) {
        if self.probe == ProbePhase::Change {
            match self.state {
                CcState::SlowStart => self.cwnd += 1.0,
                CcState::CongestionAvoidance => {
                    if let (Some(expected), Some(actual)) =
                        (self.expected_throughput, self.actual_throughput)
                    {
                        let delta = (expected - actual).abs();
                        if delta < VEGAS_ALPHA {
                            self.cwnd += 1.0 / self.cwnd + 0.125;
                        } else if delta > VEGAS_BETA {
                            self.cwnd = (self.cwnd - (1.0 / self.cwnd - 0.125)).max(1.0);
                        }
                        trace!("throughput delta {:.4}, cwnd {:.3}", delta, self.cwnd);
                    }
                }
                _ => {}
            }
        }

        if segment.distinguished {
            self.distinguished_out = false;
            if self.probe == ProbePhase::Eval {
                let actual = self.distinguished_bytes as f64 / sample.as_secs_f64();
                self.actual_throughput = Some(actual);
                debug!("actual throughput {:.4} over probe window", actual);
                if let Some(expected) = self.expected_throughput {
                    if expected - actual > VEGAS_DELTA {
                        debug!("throughput gap over {VEGAS_DELTA}, leaving slow start");
                        self.state = CcState::CongestionAvoidance;
                    }
                }
            }
        }
    }

    fn on_head_timeout(&mut self, head: &Segment) -> TimeoutReaction {
        // Rate-mismatch heuristic: only shrink when the head went out at a
        // rate close to the current expectation. With no recorded rate or no
        // expectation yet there is nothing to compare.
        if let (Some(rate), Some(expected)) = (head.sampled_rate, self.expected_throughput) {
            let delta_rate = (rate - expected).abs();
            if delta_rate < VEGAS_EPSILON {
                self.cwnd = (self.cwnd / 2.0).max(1.0);
                self.state = CcState::Timeout;
                debug!(
                    "head timeout within rate tolerance ({:.4}), cwnd {:.2}",
                    delta_rate, self.cwnd
                );
                // The halved window sits below the in-flight count; the
                // re-arm is what lets the send pass reach the head again.
                return TimeoutReaction::Rearm;
            }
            debug!("head timeout ignored, rate delta {:.4}", delta_rate);
        }
        TimeoutReaction::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtt::TimeoutPolicy;
    use bytes::Bytes;

    fn fresh_segment(seq_id: i32) -> Segment {
        Segment::new(seq_id, Bytes::from(vec![0u8; MESSAGE_SIZE]))
    }

    fn estimator() -> RttEstimator {
        RttEstimator::with_base_tracking(0.85, TimeoutPolicy::Fixed(Duration::from_secs(1)))
    }

    fn close(value: Option<f64>, expected: f64) -> bool {
        value.is_some_and(|v| (v - expected).abs() < 1e-6)
    }

    #[test]
    fn test_single_distinguished_segment_outstanding() {
        let mut vegas = Vegas::new();

        let mut first = fresh_segment(0);
        vegas.before_send(&mut first);
        assert!(first.distinguished);
        assert_eq!(vegas.probe(), ProbePhase::Eval);

        let mut second = fresh_segment(1020);
        vegas.before_send(&mut second);
        assert!(!second.distinguished);
        assert_eq!(vegas.probe(), ProbePhase::Eval);

        // Acking the probe frees the marker for the next fresh segment.
        vegas.on_segment_acked(&first, Duration::from_millis(10));
        let mut third = fresh_segment(2040);
        vegas.before_send(&mut third);
        assert!(third.distinguished);
        assert_eq!(vegas.probe(), ProbePhase::Change);
    }

    #[test]
    fn test_retransmits_never_steal_the_marker() {
        let mut vegas = Vegas::new();
        let mut probe = fresh_segment(0);
        vegas.before_send(&mut probe);
        vegas.on_segment_acked(&probe, Duration::from_millis(10));

        let mut resend = fresh_segment(1020);
        resend.send_time = Some(std::time::Instant::now());
        vegas.before_send(&mut resend);
        assert!(!resend.distinguished);
    }

    #[test]
    fn test_probe_window_accumulates_sent_bytes() {
        let mut vegas = Vegas::new();

        let mut probe = fresh_segment(0);
        vegas.before_send(&mut probe);
        let mut follower = fresh_segment(1020);
        vegas.before_send(&mut follower);

        let mut rtt = estimator();
        rtt.observe(Duration::from_millis(2));
        vegas.on_new_ack(Duration::from_millis(2), &rtt);

        // Probe lifetime covered two segments; one second of RTT makes the
        // actual throughput equal the byte count.
        vegas.on_segment_acked(&probe, Duration::from_secs(1));
        assert_eq!(vegas.actual_throughput(), Some(2.0 * MESSAGE_SIZE as f64));
    }

    #[test]
    fn test_eval_gap_ends_slow_start() {
        let mut vegas = Vegas::new();

        let mut probe = fresh_segment(0);
        vegas.before_send(&mut probe);
        assert_eq!(vegas.probe(), ProbePhase::Eval);

        let mut rtt = estimator();
        rtt.observe(Duration::from_micros(500));
        vegas.on_new_ack(Duration::from_micros(500), &rtt);
        assert!(close(vegas.expected_throughput(), 2000.0));

        // Probe comes back slowly: actual 1020/2 = 510, gap 1490 > 1000.
        vegas.on_segment_acked(&probe, Duration::from_secs(2));
        assert_eq!(vegas.actual_throughput(), Some(510.0));
        assert_eq!(vegas.state(), CcState::CongestionAvoidance);
    }

    #[test]
    fn test_change_phase_window_adjustments() {
        let mut vegas = Vegas::new();

        // Round 1 (Eval): large gap moves the transfer to congestion
        // avoidance with actual = 510 against expected = 2000.
        let mut probe = fresh_segment(0);
        vegas.before_send(&mut probe);
        let mut rtt = estimator();
        rtt.observe(Duration::from_micros(500));
        vegas.on_new_ack(Duration::from_micros(500), &rtt);
        vegas.on_segment_acked(&probe, Duration::from_secs(2));
        assert_eq!(vegas.state(), CcState::CongestionAvoidance);

        // Round 2 (Change): the stale gap is above BETA, and the decay rule
        // cannot push the window below one.
        let mut second = fresh_segment(1020);
        vegas.before_send(&mut second);
        assert_eq!(vegas.probe(), ProbePhase::Change);
        vegas.on_segment_acked(&second, Duration::from_millis(510));
        assert_eq!(vegas.cwnd(), 1.0);

        // Round 3 (Eval): a probe returning at the expected rate closes the
        // gap.
        let mut third = fresh_segment(2040);
        vegas.before_send(&mut third);
        assert_eq!(vegas.probe(), ProbePhase::Eval);
        vegas.on_new_ack(Duration::from_millis(510), &rtt);
        vegas.on_segment_acked(&third, Duration::from_millis(510));
        // actual = 1020 / 0.51 = 2000 = expected
        assert!(close(vegas.actual_throughput(), 2000.0));

        // Round 4 (Change): delta 0 < ALPHA grows the window linearly.
        let mut fourth = fresh_segment(3060);
        vegas.before_send(&mut fourth);
        assert_eq!(vegas.probe(), ProbePhase::Change);
        vegas.on_segment_acked(&fourth, Duration::from_millis(510));
        assert!((vegas.cwnd() - 2.125).abs() < 1e-12);
    }

    #[test]
    fn test_head_timeout_rate_heuristic() {
        let mut vegas = Vegas::new();
        let mut rtt = estimator();

        // No recorded rate: nothing to compare, nothing changes.
        let head = fresh_segment(0);
        assert_eq!(vegas.on_head_timeout(&head), TimeoutReaction::Ignore);
        assert_eq!(vegas.state(), CcState::SlowStart);

        // Grow to cwnd 4 in slow start, then expected = 4 / 2ms = 2000.
        for _ in 0..3 {
            vegas.on_segment_acked(&fresh_segment(0), Duration::from_millis(2));
        }
        rtt.observe(Duration::from_millis(2));
        vegas.on_new_ack(Duration::from_millis(2), &rtt);
        assert!(close(vegas.expected_throughput(), 2000.0));

        // Mismatched rate: the timeout is ignored.
        let mut stale = fresh_segment(0);
        stale.sampled_rate = Some(120.0);
        assert_eq!(vegas.on_head_timeout(&stale), TimeoutReaction::Ignore);
        assert_eq!(vegas.cwnd(), 4.0);
        assert_eq!(vegas.state(), CcState::SlowStart);

        // Matching rate: halve, enter the timeout phase and re-arm so the
        // head can be retransmitted under the shrunken window.
        let mut matching = fresh_segment(0);
        matching.sampled_rate = Some(2000.5);
        assert_eq!(vegas.on_head_timeout(&matching), TimeoutReaction::Rearm);
        assert_eq!(vegas.cwnd(), 2.0);
        assert_eq!(vegas.state(), CcState::Timeout);

        // The next send returns to slow start.
        let mut resend = fresh_segment(0);
        resend.send_time = Some(std::time::Instant::now());
        resend.in_transit = true;
        vegas.before_send(&mut resend);
        assert_eq!(vegas.state(), CcState::SlowStart);
    }

    #[test]
    fn test_halving_floors_at_one() {
        let mut vegas = Vegas::new();
        let mut rtt = estimator();
        rtt.observe(Duration::from_millis(1));
        vegas.on_new_ack(Duration::from_millis(1), &rtt);

        let mut head = fresh_segment(0);
        head.sampled_rate = vegas.expected_throughput();
        assert_eq!(vegas.on_head_timeout(&head), TimeoutReaction::Rearm);
        assert_eq!(vegas.cwnd(), 1.0);
        assert_eq!(vegas.state(), CcState::Timeout);
    }
}
