//! Latency summaries for load runs.

use std::fmt;
use std::time::Duration;

use crate::format_duration;

/// Order statistics over a set of latency samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    sorted: Vec<Duration>,
}

impl LatencyStats {
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort_unstable();
        Self { sorted: samples }
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    /// Nearest-rank percentile, `p` in `0.0..=100.0`. `None` when empty.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.sorted.is_empty() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = ((p / 100.0) * self.sorted.len() as f64).ceil() as usize;
        let idx = rank.saturating_sub(1).min(self.sorted.len() - 1);
        Some(self.sorted[idx])
    }

    pub fn max(&self) -> Option<Duration> {
        self.sorted.last().copied()
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.sorted.is_empty() {
            return None;
        }
        let total: Duration = self.sorted.iter().sum();
        Some(total / self.sorted.len() as u32)
    }
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.percentile(50.0), self.percentile(99.0), self.max()) {
            (Some(p50), Some(p99), Some(max)) => write!(
                f,
                "n={} p50={} p99={} max={}",
                self.count(),
                format_duration(p50),
                format_duration(p99),
                format_duration(max)
            ),
            _ => f.write_str("n=0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_has_no_percentiles() {
        let stats = LatencyStats::default();
        assert_eq!(stats.percentile(50.0), None);
        assert_eq!(stats.to_string(), "n=0");
    }

    #[test]
    fn nearest_rank() {
        let stats = LatencyStats::from_samples((1..=10).rev().map(ms).collect());
        assert_eq!(stats.percentile(50.0), Some(ms(5)));
        assert_eq!(stats.percentile(90.0), Some(ms(9)));
        assert_eq!(stats.percentile(100.0), Some(ms(10)));
        assert_eq!(stats.percentile(0.0), Some(ms(1)));
        assert_eq!(stats.mean(), Some(Duration::from_micros(5_500)));
    }
}
