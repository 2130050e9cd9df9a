//! Kernel route diffing

use crate::next_hop::{hop_count_changed, next_hop_changed, FibMetric, NextHop};
use crate::table::{Rib, RtEntry};
use mesh_topology::Prefix;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Route as handed to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FibRoute {
    /// Destination prefix
    pub dst: Prefix,
    /// Gateway and egress interface
    pub next_hop: NextHop,
    /// Reported route metric
    pub metric: u8,
}

impl fmt::Display for FibRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} metric {}", self.dst, self.next_hop, self.metric)
    }
}

/// Writer of kernel routes
pub trait KernelSync {
    /// Install a new route
    fn add_route(&mut self, route: &FibRoute);

    /// Replace the next hop or metric of an installed route
    fn change_route(&mut self, route: &FibRoute);

    /// Withdraw an installed route
    fn delete_route(&mut self, route: &FibRoute);
}

/// Counts of kernel operations issued by one sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Routes added
    pub added: usize,
    /// Routes changed
    pub changed: usize,
    /// Routes deleted
    pub deleted: usize,
}

impl SyncReport {
    /// Whether no kernel operation was issued
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.changed == 0 && self.deleted == 0
    }
}

impl Rib {
    /// Diff the RIB against what was last installed and push the difference
    /// to the kernel. `removed` are the entries dropped by the last pass.
    pub fn sync_kernel<K>(&mut self, removed: &[RtEntry], kernel: &mut K) -> SyncReport
    where
        K: KernelSync + ?Sized,
    {
        let mode = self.config().fib_metric;
        let mut report = SyncReport::default();

        for entry in removed {
            if let Some((next_hop, metric)) = entry.installed() {
                kernel.delete_route(&FibRoute {
                    dst: entry.dst,
                    next_hop,
                    metric: mode.fib_metric(&metric),
                });
                report.deleted += 1;
            }
        }

        for entry in self.entries_mut() {
            let Some(best) = entry.best().copied() else {
                continue;
            };
            let route = FibRoute {
                dst: entry.dst,
                next_hop: best.next_hop,
                metric: mode.fib_metric(&best.metric),
            };

            match entry.installed() {
                None => {
                    kernel.add_route(&route);
                    report.added += 1;
                }
                Some((next_hop, metric))
                    if next_hop_changed(&next_hop, &best.next_hop)
                        || (mode == FibMetric::Correct && hop_count_changed(&metric, &best.metric)) =>
                {
                    kernel.change_route(&route);
                    report.changed += 1;
                }
                Some(_) => {}
            }
            entry.set_installed(best.next_hop, best.metric);
        }

        if !report.is_empty() {
            debug!(
                "Kernel sync: {} added, {} changed, {} deleted",
                report.added, report.changed, report.deleted
            );
        }
        report
    }

    /// Routes currently installed, in prefix order
    pub fn fib_routes(&self) -> Vec<FibRoute> {
        let mode = self.config().fib_metric;
        self.iter()
            .filter_map(|entry| {
                entry.installed().map(|(next_hop, metric)| FibRoute {
                    dst: entry.dst,
                    next_hop,
                    metric: mode.fib_metric(&metric),
                })
            })
            .collect()
    }
}
