//! Node state driven by the event loop: neighbor table, topology set, RIB
//! and the kernel route writer.

use crate::config::NodeConfig;
use mesh_neighbor::{MprSelector, NeighborTable};
use mesh_routing::{FibRoute, KernelSync, PassSummary, Rib, RouteCalculator, SyncReport};
use mesh_topology::{NextHop, Prefix, TopologyDatabase};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tracing::{debug, warn};

/// Kernel writer that only logs the route operations
#[derive(Debug, Default)]
pub struct LoggingKernelSync;

impl KernelSync for LoggingKernelSync {
    fn add_route(&mut self, route: &FibRoute) {
        crate::component_info!("kernel", "add {}", route);
    }

    fn change_route(&mut self, route: &FibRoute) {
        crate::component_info!("kernel", "change {}", route);
    }

    fn delete_route(&mut self, route: &FibRoute) {
        crate::component_info!("kernel", "delete {}", route);
    }
}

/// Result of one scheduled pass
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    /// A previously selected relay was dropped
    pub mpr_changed: bool,
    /// A topology advertisement was requested
    pub force_tc: bool,
    /// Current relay set
    pub mprs: Vec<IpAddr>,
    /// Routing table pass summary
    pub rib: PassSummary,
    /// Kernel operations issued
    pub kernel: SyncReport,
    /// Routes installed after the pass
    pub routes: Vec<FibRoute>,
}

/// Route computation state of one node
pub struct Node<K> {
    neighbors: NeighborTable,
    selector: MprSelector,
    topology: TopologyDatabase,
    rib: Rib,
    calculator: RouteCalculator,
    kernel: K,
    /// (originator, prefix) pairs currently inserted into the RIB
    advertised: BTreeSet<(IpAddr, Prefix)>,
}

impl<K: KernelSync> Node<K> {
    pub fn new(config: &NodeConfig, kernel: K) -> Self {
        Self {
            neighbors: NeighborTable::new(),
            selector: MprSelector::new(config.mpr.clone()),
            topology: TopologyDatabase::new(),
            rib: Rib::new(config.rib.clone()),
            calculator: RouteCalculator::new(),
            kernel,
            advertised: BTreeSet::new(),
        }
    }

    /// Bring the neighbor table, topology set and candidate paths in line
    /// with a (re)loaded configuration. Invalid scenario items are logged
    /// and skipped.
    pub fn apply(&mut self, config: &NodeConfig) {
        self.selector.set_config(config.mpr.clone());
        self.rib.set_config(config.rib.clone());

        self.apply_neighbors(config);
        self.apply_originators(config);
        self.apply_prefixes(config);

        self.topology.cleanup_unreferenced();
    }

    fn apply_neighbors(&mut self, config: &NodeConfig) {
        let wanted: BTreeMap<IpAddr, _> = config
            .neighbors
            .iter()
            .map(|neighbor| (neighbor.addr, neighbor))
            .collect();

        let gone: Vec<IpAddr> = self
            .neighbors
            .neighbors()
            .map(|entry| entry.main_addr)
            .filter(|addr| !wanted.contains_key(addr))
            .collect();
        for addr in gone {
            self.neighbors.remove_neighbor(&addr);
        }

        for neighbor in wanted.values() {
            self.neighbors
                .add_neighbor(neighbor.addr, neighbor.status, neighbor.willingness);
        }

        let links: BTreeSet<(IpAddr, IpAddr)> = config
            .two_hop_links
            .iter()
            .map(|link| (link.neighbor, link.two_hop))
            .collect();

        let stale: Vec<(IpAddr, IpAddr)> = self
            .neighbors
            .links()
            .map(|link| (link.neighbor, link.two_hop))
            .filter(|link| !links.contains(link))
            .collect();
        for (neighbor, two_hop) in stale {
            self.neighbors.remove_two_hop_link(&neighbor, &two_hop);
        }

        for (neighbor, two_hop) in links {
            if let Err(e) = self.neighbors.add_two_hop_link(neighbor, two_hop) {
                warn!("Skipping two-hop link {} -> {}: {}", neighbor, two_hop, e);
            }
        }
    }

    fn apply_originators(&mut self, config: &NodeConfig) {
        let wanted: BTreeSet<IpAddr> = config.originators.iter().map(|o| o.addr).collect();

        let lost: Vec<IpAddr> = self
            .topology
            .reachable()
            .map(|tc| tc.addr)
            .filter(|addr| !wanted.contains(addr))
            .collect();
        for addr in lost {
            self.topology.set_unreachable(&addr);
        }

        for originator in &config.originators {
            self.topology.set_reachability(
                originator.addr,
                originator.cost,
                originator.hops,
                NextHop::new(originator.gateway, originator.if_index),
            );
        }
    }

    fn apply_prefixes(&mut self, config: &NodeConfig) {
        let mut wanted = BTreeMap::new();
        for advertised in &config.prefixes {
            match advertised.prefix.parse::<Prefix>() {
                Ok(prefix) => {
                    wanted.insert((advertised.originator, prefix), advertised.origin);
                }
                Err(e) => warn!(
                    "Skipping prefix {:?} from {}: {}",
                    advertised.prefix, advertised.originator, e
                ),
            }
        }

        let withdrawn: Vec<(IpAddr, Prefix)> = self
            .advertised
            .iter()
            .filter(|key| !wanted.contains_key(*key))
            .copied()
            .collect();
        for (originator, prefix) in withdrawn {
            self.rib
                .remove_candidate(&mut self.topology, originator, prefix.addr, prefix.len);
            self.advertised.remove(&(originator, prefix));
        }

        for ((originator, prefix), origin) in wanted {
            match self.rib.insert_candidate(
                &mut self.topology,
                originator,
                prefix.addr,
                prefix.len,
                origin,
            ) {
                Ok(_) => {
                    self.advertised.insert((originator, prefix));
                }
                Err(e) => debug!("Dropped advertisement {} from {}: {}", prefix, originator, e),
            }
        }
    }

    /// Recompute the relay set and the routing table, then sync the kernel
    pub fn run_pass(&mut self) -> PassOutcome {
        let mut force_tc = false;
        let mpr_changed = self
            .selector
            .recompute_mpr_set(&mut self.neighbors, &mut |force: bool| force_tc |= force);

        let report = self
            .calculator
            .calculate_routing_table(&mut self.rib, &self.topology);
        let kernel = self.rib.sync_kernel(&report.removed, &mut self.kernel);

        PassOutcome {
            mpr_changed,
            force_tc,
            mprs: self.neighbors.mpr_set(),
            rib: report.summary(),
            kernel,
            routes: self.rib.fib_routes(),
        }
    }

    pub fn passes(&self) -> u64 {
        self.calculator.passes()
    }
}
