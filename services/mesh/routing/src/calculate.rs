//! Routing table recomputation pass

use crate::next_hop::Metric;
use crate::table::{Rib, RtEntry};
use mesh_topology::{Prefix, TopologyDatabase};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one recomputation pass
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Routing tree version the pass ran at
    pub version: u64,
    /// Entries left in the index
    pub entries: usize,
    /// Candidates refreshed from reachable originators
    pub updated: usize,
    /// Entries dropped because no candidate survived
    pub removed: Vec<RtEntry>,
    /// Whether candidates were inserted or removed since the last pass
    pub prefixes_changed: bool,
}

/// Pass summary for logging and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    /// Routing tree version
    pub version: u64,
    /// Entries left in the index
    pub entries: usize,
    /// Candidates refreshed
    pub updated: usize,
    /// Prefixes removed
    pub removed: Vec<Prefix>,
}

impl PassReport {
    /// Summary without the removed entries' bodies
    pub fn summary(&self) -> PassSummary {
        PassSummary {
            version: self.version,
            entries: self.entries,
            updated: self.updated,
            removed: self.removed.iter().map(|entry| entry.dst).collect(),
        }
    }
}

/// Drives recomputation passes over a RIB
#[derive(Debug, Default)]
pub struct RouteCalculator {
    passes: u64,
}

impl RouteCalculator {
    /// Create a new calculator
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes run so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one pass: stamp every candidate of a reachable originator with a
    /// new version, drop what went stale and reselect best paths.
    pub fn calculate_routing_table(
        &mut self,
        rib: &mut Rib,
        topology: &TopologyDatabase,
    ) -> PassReport {
        let version = rib.bump_version();
        let mut updated = 0;

        for tc in topology.reachable() {
            let Some(next_hop) = tc.next_hop else {
                continue;
            };
            let metric = Metric::new(tc.hops, tc.path_cost);

            for (prefix, id) in tc.paths() {
                match rib.update_candidate(*id, next_hop, metric) {
                    Ok(()) => updated += 1,
                    Err(e) => debug!("Skipping {} from {}: {}", prefix, tc.addr, e),
                }
            }
        }

        let removed = rib.reap_stale(version);

        let prefixes: Vec<Prefix> = rib.iter().map(|entry| entry.dst).collect();
        for prefix in &prefixes {
            rib.select_best(prefix);
        }

        self.passes += 1;
        let report = PassReport {
            version,
            entries: rib.len(),
            updated,
            removed,
            prefixes_changed: rib.take_prefix_changes(),
        };

        info!(
            component = "rib",
            "Routing table pass {}: {} entries, {} candidates updated, {} removed",
            report.version,
            report.entries,
            report.updated,
            report.removed.len()
        );
        rib.log_table();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RouteOrigin;
    use mesh_topology::{AddressFamily, NextHop};
    use std::net::IpAddr;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_pass_selects_best_paths() {
        let mut rib = Rib::default();
        let mut topo = TopologyDatabase::new();
        let mut calc = RouteCalculator::new();
        let prefix: Prefix = "10.0.0.0/24".parse().unwrap();

        rib.insert_candidate(&mut topo, addr("10.9.0.1"), prefix.addr, 24, RouteOrigin::Hna)
            .unwrap();
        rib.insert_candidate(&mut topo, addr("10.9.0.2"), prefix.addr, 24, RouteOrigin::Hna)
            .unwrap();
        topo.set_reachability(addr("10.9.0.1"), 20, 2, NextHop::new(addr("10.0.0.2"), 1));
        topo.set_reachability(addr("10.9.0.2"), 20, 3, NextHop::new(addr("10.0.0.3"), 1));

        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.version, 1);
        assert_eq!(report.entries, 1);
        assert_eq!(report.updated, 2);
        assert!(report.removed.is_empty());
        assert!(report.prefixes_changed);
        assert_eq!(rib.get(&prefix).unwrap().to_string(), "10.0.0.0/24 via 10.0.0.2");

        // P1's originator drops out, P2 takes over
        topo.set_unreachable(&addr("10.9.0.1"));
        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.version, 2);
        assert_eq!(report.updated, 1);
        assert!(!report.prefixes_changed);
        let entry = rib.get(&prefix).unwrap();
        assert_eq!(entry.path_count(), 1);
        assert_eq!(entry.to_string(), "10.0.0.0/24 via 10.0.0.3");
        assert_eq!(calc.passes(), 2);
    }

    #[test]
    fn test_unreachable_originator_entries_are_removed() {
        let mut rib = Rib::default();
        let mut topo = TopologyDatabase::new();
        let mut calc = RouteCalculator::new();

        rib.insert_candidate(&mut topo, addr("10.9.0.1"), addr("10.1.0.0"), 16, RouteOrigin::Hna)
            .unwrap();
        rib.insert_candidate(&mut topo, addr("10.9.0.1"), addr("10.9.0.1"), 32, RouteOrigin::Tc)
            .unwrap();
        topo.set_reachability(addr("10.9.0.1"), 10, 1, NextHop::new(addr("10.9.0.1"), 1));

        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.entries, 2);
        assert!(rib.lookup(addr("10.9.0.1")).is_some());

        topo.set_unreachable(&addr("10.9.0.1"));
        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.entries, 0);
        assert_eq!(
            report.summary().removed,
            vec![
                "10.1.0.0/16".parse::<Prefix>().unwrap(),
                "10.9.0.1/32".parse::<Prefix>().unwrap()
            ]
        );
        assert!(rib.is_empty());

        // comes back once reachable again
        topo.set_reachability(addr("10.9.0.1"), 10, 1, NextHop::new(addr("10.9.0.1"), 1));
        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.entries, 2);
        assert_eq!(rib.get_stats().linked_paths, 2);
    }

    #[test]
    fn test_never_reachable_candidates_do_not_linger() {
        let mut rib = Rib::default();
        let mut topo = TopologyDatabase::new();
        let mut calc = RouteCalculator::new();

        rib.insert_candidate(&mut topo, addr("10.9.0.7"), addr("10.7.0.0"), 16, RouteOrigin::Hna)
            .unwrap();
        let report = calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(report.entries, 0);
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].installed(), None);
    }

    #[test]
    fn test_default_route_pass() {
        let mut rib = Rib::default();
        let mut topo = TopologyDatabase::new();
        let mut calc = RouteCalculator::new();
        let default = Prefix::default_route(AddressFamily::Ipv4);

        let gw = rib
            .insert_candidate(&mut topo, addr("10.9.0.1"), default.addr, 0, RouteOrigin::Hna)
            .unwrap();
        topo.set_reachability(addr("10.9.0.1"), 10, 1, NextHop::new(addr("10.0.0.2"), 1));

        calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(rib.current_inet_gw(), Some(gw));

        topo.set_unreachable(&addr("10.9.0.1"));
        calc.calculate_routing_table(&mut rib, &topo);
        assert_eq!(rib.current_inet_gw(), None);
    }
}
