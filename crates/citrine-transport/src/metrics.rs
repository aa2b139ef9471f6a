//! Transfer accounting and the final report line.

use std::fmt;
use std::time::{Duration, Instant};

/// Append-only accounting for one transfer. Nothing here is read back until
/// the report is produced.
#[derive(Debug)]
pub struct TransferMetrics {
    started_at: Instant,
    finished_at: Option<Instant>,
    total_bytes: u64,
    delays: Vec<Duration>,
}

impl TransferMetrics {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            finished_at: None,
            total_bytes: 0,
            delays: Vec::new(),
        }
    }

    /// Counts one wire emission of a segment payload, retransmits included.
    pub fn record_sent(&mut self, payload_len: usize) {
        self.total_bytes += payload_len as u64;
    }

    /// Appends the delay measured for one acknowledged segment.
    pub fn record_delay(&mut self, delay: Duration) {
        self.delays.push(delay);
    }

    /// Marks the end of the transfer. Later calls keep the first mark.
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Instant::now());
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn report(&self) -> TransferReport {
        let end = self.finished_at.unwrap_or_else(Instant::now);
        TransferReport::compute(
            self.total_bytes,
            end.duration_since(self.started_at),
            &self.delays,
        )
    }
}

/// The final `throughput,avg_delay,avg_jitter,metric` tuple. Throughput is
/// bytes per second; delay and jitter are seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferReport {
    pub throughput: f64,
    pub avg_delay: f64,
    pub avg_jitter: f64,
    pub metric: f64,
}

impl TransferReport {
    pub fn compute(total_bytes: u64, elapsed: Duration, delays: &[Duration]) -> Self {
        let mut throughput = 0.0;
        let elapsed_secs = elapsed.as_secs_f64();
        if elapsed_secs > 0.0 {
            throughput = total_bytes as f64 / elapsed_secs;
        }

        let mut avg_delay = 0.0;
        if !delays.is_empty() {
            avg_delay =
                delays.iter().map(Duration::as_secs_f64).sum::<f64>() / delays.len() as f64;
        }

        let mut avg_jitter = 0.0;
        if delays.len() > 1 {
            let jitter_sum: f64 = delays
                .windows(2)
                .map(|pair| (pair[1].as_secs_f64() - pair[0].as_secs_f64()).abs())
                .sum();
            avg_jitter = jitter_sum / (delays.len() - 1) as f64;
        }

        let mut metric = 0.0;
        if avg_jitter > 0.0 && avg_delay > 0.0 {
            metric = 0.2 * (throughput / 2000.0) + 0.1 / avg_jitter + 0.8 / avg_delay;
        }

        Self {
            throughput,
            avg_delay,
            avg_jitter,
            metric,
        }
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.7},{:.7},{:.7},{:.7}",
            self.throughput, self.avg_delay, self.avg_jitter, self.metric
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_report_formulas() {
        let delays = [
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ];
        let report = TransferReport::compute(4000, Duration::from_secs(2), &delays);

        assert!(close(report.throughput, 2000.0));
        let avg_delay = (0.010 + 0.020 + 0.040) / 3.0;
        assert!(close(report.avg_delay, avg_delay));
        let avg_jitter = (0.010 + 0.020) / 2.0;
        assert!(close(report.avg_jitter, avg_jitter));
        let metric = 0.2 * (2000.0 / 2000.0) + 0.1 / avg_jitter + 0.8 / avg_delay;
        assert!(close(report.metric, metric));
    }

    #[test]
    fn test_report_degenerate_inputs() {
        let report = TransferReport::compute(1000, Duration::ZERO, &[]);
        assert_eq!(report.throughput, 0.0);
        assert_eq!(report.avg_delay, 0.0);
        assert_eq!(report.avg_jitter, 0.0);
        assert_eq!(report.metric, 0.0);

        // One delay: no jitter pairs, so the composite stays zero.
        let report =
            TransferReport::compute(1000, Duration::from_secs(1), &[Duration::from_millis(5)]);
        assert_eq!(report.avg_jitter, 0.0);
        assert_eq!(report.metric, 0.0);
    }

    #[test]
    fn test_display_has_seven_fraction_digits() {
        let report = TransferReport {
            throughput: 1234.5,
            avg_delay: 0.25,
            avg_jitter: 0.125,
            metric: 4.0,
        };
        assert_eq!(
            report.to_string(),
            "1234.5000000,0.2500000,0.1250000,4.0000000"
        );
    }

    #[test]
    fn test_metrics_accumulation() {
        let mut metrics = TransferMetrics::start();
        metrics.record_sent(1020);
        metrics.record_sent(1020);
        metrics.record_sent(480);
        assert_eq!(metrics.total_bytes(), 2520);

        metrics.record_delay(Duration::from_millis(3));
        metrics.finish();
        let report = metrics.report();
        assert!(report.throughput > 0.0);
        assert!(close(report.avg_delay, 0.003));
    }
}
