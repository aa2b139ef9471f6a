//! Round-trip-time estimation and the retransmission timeout derived from it.

use crate::consts::MIN_RTT_SAMPLE;
use std::time::Duration;

/// How the retransmission timeout follows the estimate.
#[derive(Debug, Clone, Copy)]
pub enum TimeoutPolicy {
    /// Timeout pinned to a constant, regardless of samples.
    Fixed(Duration),
    /// Timeout tracks `factor x estimated_rtt` after every sample.
    ScaledEstimate(f64),
}

/// Exponentially smoothed RTT with an optional base-RTT minimum.
///
/// The estimate weighs the previous value by `alpha` and the new sample by
/// `1 - alpha`. The base RTT, when tracked, is the smallest sample observed
/// above the clock-noise floor.
#[derive(Debug)]
pub struct RttEstimator {
    alpha: f64,
    estimated: Duration,
    base: Option<Duration>,
    track_base: bool,
    policy: TimeoutPolicy,
    timeout: Duration,
}

impl RttEstimator {
    pub fn new(alpha: f64, policy: TimeoutPolicy) -> Self {
        let timeout = match policy {
            TimeoutPolicy::Fixed(timeout) => timeout,
            TimeoutPolicy::ScaledEstimate(_) => Duration::from_secs(1),
        };
        Self {
            alpha,
            estimated: Duration::ZERO,
            base: None,
            track_base: false,
            policy,
            timeout,
        }
    }

    /// Same as `new`, additionally tracking the base-RTT minimum.
    pub fn with_base_tracking(alpha: f64, policy: TimeoutPolicy) -> Self {
        Self {
            track_base: true,
            ..Self::new(alpha, policy)
        }
    }

    /// Estimator for variants whose retransmission timeout never moves.
    pub fn fixed_timeout(timeout: Duration) -> Self {
        Self::new(0.0, TimeoutPolicy::Fixed(timeout))
    }

    pub fn estimated(&self) -> Duration {
        self.estimated
    }

    pub fn base_rtt(&self) -> Option<Duration> {
        self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feeds one sample taken from a fresh cumulative acknowledgement.
    pub fn observe(&mut self, sample: Duration) {
        if self.track_base {
            match self.base {
                // A missing or noise-level base is replaced outright.
                None => self.base = Some(sample),
                Some(base) if base < MIN_RTT_SAMPLE => self.base = Some(sample),
                Some(base) if sample < base && sample > MIN_RTT_SAMPLE => {
                    self.base = Some(sample)
                }
                _ => {}
            }
        }

        let smoothed = self.alpha * self.estimated.as_secs_f64()
            + (1.0 - self.alpha) * sample.as_secs_f64();
        self.estimated = Duration::from_secs_f64(smoothed);

        if let TimeoutPolicy::ScaledEstimate(factor) = self.policy {
            self.timeout = Duration::from_secs_f64(factor * smoothed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Duration, b: Duration) -> bool {
        (a.as_secs_f64() - b.as_secs_f64()).abs() < 1e-9
    }

    #[test]
    fn test_smoothing_weights_previous_estimate() {
        let mut rtt = RttEstimator::new(0.85, TimeoutPolicy::Fixed(Duration::from_secs(1)));
        rtt.observe(Duration::from_millis(100));
        assert!(close(rtt.estimated(), Duration::from_millis(15)));

        rtt.observe(Duration::from_millis(100));
        let expected = 0.85 * 0.015 + 0.15 * 0.1;
        assert!(close(rtt.estimated(), Duration::from_secs_f64(expected)));
        // Fixed policy: the timeout never moves.
        assert_eq!(rtt.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_scaled_timeout_follows_estimate() {
        let mut rtt = RttEstimator::new(0.85, TimeoutPolicy::ScaledEstimate(100.0));
        assert_eq!(rtt.timeout(), Duration::from_secs(1));
        rtt.observe(Duration::from_millis(10));
        // estimate = 0.15 * 10ms, timeout = 100x that
        assert!(close(rtt.timeout(), Duration::from_secs_f64(0.15)));
    }

    #[test]
    fn test_base_rtt_tracks_minimum_above_noise_floor() {
        let mut rtt =
            RttEstimator::with_base_tracking(0.85, TimeoutPolicy::Fixed(Duration::from_secs(1)));
        assert_eq!(rtt.base_rtt(), None);

        rtt.observe(Duration::from_millis(20));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_millis(20)));

        rtt.observe(Duration::from_millis(30));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_millis(20)));

        rtt.observe(Duration::from_millis(5));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_millis(5)));

        // Below the noise floor: not taken as a new minimum.
        rtt.observe(Duration::from_micros(50));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_noise_level_base_is_replaced() {
        let mut rtt =
            RttEstimator::with_base_tracking(0.85, TimeoutPolicy::Fixed(Duration::from_secs(1)));
        rtt.observe(Duration::from_micros(10));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_micros(10)));
        // First real sample replaces the noise-level base even though larger.
        rtt.observe(Duration::from_millis(8));
        assert_eq!(rtt.base_rtt(), Some(Duration::from_millis(8)));
    }

    #[test]
    fn test_untracked_base_stays_none() {
        let mut rtt = RttEstimator::fixed_timeout(Duration::from_secs(1));
        rtt.observe(Duration::from_millis(12));
        assert_eq!(rtt.base_rtt(), None);
    }
}
