//! Next hop and metric helpers used when diffing against the kernel

use mesh_topology::LinkCost;
use serde::{Deserialize, Serialize};

pub use mesh_topology::NextHop;

/// Metric reported to the kernel when hop counts are not used
pub const RT_METRIC_DEFAULT: u8 = 2;

/// Route metric of a candidate path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Metric {
    /// Hop count to the originator
    pub hops: u8,
    /// Path cost to the originator
    pub cost: LinkCost,
}

impl Metric {
    /// Create a new metric
    pub fn new(hops: u8, cost: LinkCost) -> Self {
        Self { hops, cost }
    }
}

/// How the metric of kernel routes is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FibMetric {
    /// Every route gets [`RT_METRIC_DEFAULT`]
    #[default]
    Flat,
    /// Routes carry their hop count
    Correct,
    /// Like flat for the reported metric; hop count changes never force a
    /// kernel update
    Approx,
}

impl FibMetric {
    /// Metric to report to the kernel
    pub fn fib_metric(self, metric: &Metric) -> u8 {
        match self {
            FibMetric::Correct => metric.hops,
            FibMetric::Flat | FibMetric::Approx => RT_METRIC_DEFAULT,
        }
    }
}

/// Whether gateway or interface differ
pub fn next_hop_changed(a: &NextHop, b: &NextHop) -> bool {
    a.gateway != b.gateway || a.if_index != b.if_index
}

/// Whether the hop counts differ
pub fn hop_count_changed(a: &Metric, b: &Metric) -> bool {
    a.hops != b.hops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fib_metric() {
        let metric = Metric::new(4, 1200);
        assert_eq!(FibMetric::Correct.fib_metric(&metric), 4);
        assert_eq!(FibMetric::Flat.fib_metric(&metric), RT_METRIC_DEFAULT);
        assert_eq!(FibMetric::Approx.fib_metric(&metric), RT_METRIC_DEFAULT);
    }

    #[test]
    fn test_change_detection() {
        let a = NextHop::new("10.0.0.2".parse().unwrap(), 1);
        let b = NextHop::new("10.0.0.2".parse().unwrap(), 2);
        let c = NextHop::new("10.0.0.3".parse().unwrap(), 1);
        assert!(!next_hop_changed(&a, &a));
        assert!(next_hop_changed(&a, &b));
        assert!(next_hop_changed(&a, &c));

        assert!(hop_count_changed(&Metric::new(1, 10), &Metric::new(2, 10)));
        // cost alone is not a hop count change
        assert!(!hop_count_changed(&Metric::new(1, 10), &Metric::new(1, 20)));
    }

    #[test]
    fn test_fib_metric_serde() {
        let mode: FibMetric = serde_json::from_str("\"correct\"").unwrap();
        assert_eq!(mode, FibMetric::Correct);
        assert_eq!(serde_json::to_string(&FibMetric::Flat).unwrap(), "\"flat\"");
    }
}
