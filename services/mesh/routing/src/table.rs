//! Routing information base with per-originator candidate paths

use crate::best_path::compare_paths;
use crate::error::RibError;
use crate::next_hop::{FibMetric, Metric, NextHop};
use mesh_topology::{AddressFamily, PathId, Prefix, TopologyDatabase, ROUTE_COST_BROKEN};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, trace};

/// RIB configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RibConfig {
    /// Address family this node routes
    pub family: AddressFamily,
    /// Cost multiplier applied to the current internet gateway when
    /// ranking default route candidates
    pub lq_nat_thresh: f32,
    /// How kernel route metrics are derived
    pub fib_metric: FibMetric,
}

impl Default for RibConfig {
    fn default() -> Self {
        Self {
            family: AddressFamily::Ipv4,
            lq_nat_thresh: 1.0,
            fib_metric: FibMetric::Flat,
        }
    }
}

/// Advertisement a candidate path was learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteOrigin {
    /// Topology control message
    Tc,
    /// Host and network association
    Hna,
    /// Multiple interface declaration
    Mid,
    /// Locally configured
    Local,
}

impl fmt::Display for RouteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteOrigin::Tc => write!(f, "tc"),
            RouteOrigin::Hna => write!(f, "hna"),
            RouteOrigin::Mid => write!(f, "mid"),
            RouteOrigin::Local => write!(f, "local"),
        }
    }
}

/// One originator's candidate path towards a prefix
#[derive(Debug, Clone, PartialEq)]
pub struct RtPath {
    /// Path handle
    pub id: PathId,
    /// Destination prefix
    pub dst: Prefix,
    /// Originator that advertised the prefix
    pub originator: IpAddr,
    /// Advertisement kind
    pub origin: RouteOrigin,
    /// First hop towards the originator, set by the first update
    pub next_hop: Option<NextHop>,
    /// Hops and cost towards the originator
    pub metric: Metric,
    /// Routing tree version of the last update
    pub version: u64,
    /// Whether the path sits in its entry's candidate set
    linked: bool,
}

impl RtPath {
    /// Whether the path is part of its route entry. Paths of unreachable
    /// originators are detached but stay anchored at the originator.
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

impl fmt::Display for RtPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} via ", self.dst, self.originator)?;
        match &self.next_hop {
            Some(next_hop) => write!(f, "{}", next_hop.gateway)?,
            None => write!(f, "-")?,
        }
        write!(
            f,
            ", cost {}, metric {}, v {}",
            self.metric.cost, self.metric.hops, self.version
        )
    }
}

/// Snapshot of the path chosen by best-path selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestPath {
    /// Selected path
    pub path: PathId,
    /// Its originator
    pub originator: IpAddr,
    /// Its next hop
    pub next_hop: NextHop,
    /// Its metric
    pub metric: Metric,
}

/// Route entry for one destination prefix
#[derive(Debug, Clone, PartialEq)]
pub struct RtEntry {
    /// Destination prefix
    pub dst: Prefix,
    /// Candidate paths keyed by originator
    paths: BTreeMap<IpAddr, PathId>,
    /// Result of the last best-path selection
    best: Option<BestPath>,
    /// Next hop and metric last handed to the kernel
    installed: Option<(NextHop, Metric)>,
    /// Whether best-path selection ever ran on this entry
    selected: bool,
}

impl RtEntry {
    fn new(dst: Prefix) -> Self {
        Self {
            dst,
            paths: BTreeMap::new(),
            best: None,
            installed: None,
            selected: false,
        }
    }

    /// Candidate paths in originator order
    pub fn paths(&self) -> impl Iterator<Item = (&IpAddr, &PathId)> {
        self.paths.iter()
    }

    /// Candidate path of an originator
    pub fn path_from(&self, originator: &IpAddr) -> Option<PathId> {
        self.paths.get(originator).copied()
    }

    /// Number of candidate paths
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Whether no candidate is left
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Current best path
    pub fn best(&self) -> Option<&BestPath> {
        self.best.as_ref()
    }

    /// Next hop and metric last installed in the kernel
    pub fn installed(&self) -> Option<(NextHop, Metric)> {
        self.installed
    }

    /// Next hop to hand to kernel sync: the best path's for add and change,
    /// the last installed one once the entry has no candidates left.
    pub fn next_hop_for_sync(&self) -> Option<NextHop> {
        if self.paths.is_empty() {
            self.installed.map(|(next_hop, _)| next_hop)
        } else {
            self.best.map(|best| best.next_hop)
        }
    }

    pub(crate) fn set_installed(&mut self, next_hop: NextHop, metric: Metric) {
        self.installed = Some((next_hop, metric));
    }
}

impl fmt::Display for RtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next_hop_for_sync() {
            Some(next_hop) => write!(f, "{} via {}", self.dst, next_hop.gateway),
            None => write!(f, "{} unreachable", self.dst),
        }
    }
}

/// RIB statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RibStats {
    /// Current routing tree version
    pub version: u64,
    /// Route entries in the index
    pub entries: usize,
    /// Allocated candidate paths
    pub paths: usize,
    /// Candidate paths attached to an entry
    pub linked_paths: usize,
}

/// Routing information base
#[derive(Debug)]
pub struct Rib {
    config: RibConfig,
    /// Route entries ordered by prefix
    entries: BTreeMap<Prefix, RtEntry>,
    /// Candidate path arena
    paths: HashMap<PathId, RtPath>,
    next_path_id: u64,
    /// Routing tree version
    version: u64,
    /// Path currently selected for the default route
    current_inet_gw: Option<PathId>,
    prefix_changed: bool,
}

impl Rib {
    /// Create an empty RIB
    pub fn new(config: RibConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::new(),
            paths: HashMap::new(),
            next_path_id: 1,
            version: 0,
            current_inet_gw: None,
            prefix_changed: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &RibConfig {
        &self.config
    }

    /// Replace the configuration. The address family is fixed at creation.
    pub fn set_config(&mut self, config: RibConfig) {
        if config.family != self.config.family {
            debug!(
                "Ignoring address family change from {} to {}",
                self.config.family, config.family
            );
        }
        self.config = RibConfig {
            family: self.config.family,
            ..config
        };
    }

    fn check_prefix(&self, prefix: Prefix) -> Result<(), RibError> {
        let family = self.config.family;
        if prefix.family() != family {
            return Err(RibError::FamilyMismatch { prefix, family });
        }
        let max = family.max_prefix_len();
        if prefix.len > max {
            return Err(RibError::PrefixTooLong { prefix, max });
        }
        Ok(())
    }

    /// Add a candidate path for `dst/plen` learned from `originator`.
    ///
    /// Returns the existing candidate if the originator already advertised
    /// this prefix. New candidates carry version 0 until the next pass
    /// updates them.
    pub fn insert_candidate(
        &mut self,
        topology: &mut TopologyDatabase,
        originator: IpAddr,
        dst: IpAddr,
        plen: u8,
        origin: RouteOrigin,
    ) -> Result<PathId, RibError> {
        let prefix = Prefix::new(dst, plen);
        if let Err(e) = self.check_prefix(prefix) {
            debug!("Dropping {} advertisement from {}: {}", origin, originator, e);
            return Err(e);
        }

        let tc = topology.locate(originator);
        if let Some(id) = tc.prefix(&prefix) {
            if self.paths.contains_key(&id) {
                return Ok(id);
            }
        }

        let id = PathId(self.next_path_id);
        self.next_path_id += 1;

        tc.anchor_prefix(prefix, id);
        self.paths.insert(
            id,
            RtPath {
                id,
                dst: prefix,
                originator,
                origin,
                next_hop: None,
                metric: Metric::new(0, ROUTE_COST_BROKEN),
                version: 0,
                linked: true,
            },
        );
        self.entries
            .entry(prefix)
            .or_insert_with(|| RtEntry::new(prefix))
            .paths
            .insert(originator, id);

        self.prefix_changed = true;
        debug!("Inserted {} candidate {} for {} from {}", origin, id, prefix, originator);
        Ok(id)
    }

    /// Remove the candidate path `originator` advertised for `dst/plen`.
    ///
    /// An entry left without candidates stays in the index until the next
    /// reap so its route can be withdrawn, unless best-path selection never
    /// ran on it.
    pub fn remove_candidate(
        &mut self,
        topology: &mut TopologyDatabase,
        originator: IpAddr,
        dst: IpAddr,
        plen: u8,
    ) -> bool {
        let prefix = Prefix::new(dst, plen);
        let id = match topology
            .lookup_mut(&originator)
            .and_then(|tc| tc.release_prefix(&prefix))
        {
            Some(id) => id,
            None => return false,
        };

        let path = match self.paths.remove(&id) {
            Some(path) => path,
            None => return false,
        };

        if path.linked {
            let drop_entry = match self.entries.get_mut(&prefix) {
                Some(entry) => {
                    entry.paths.remove(&originator);
                    if entry.best.is_some_and(|best| best.path == id) {
                        entry.best = None;
                    }
                    entry.paths.is_empty() && !entry.selected
                }
                None => false,
            };
            if drop_entry {
                self.entries.remove(&prefix);
            }
        }

        if self.current_inet_gw == Some(id) {
            self.current_inet_gw = None;
        }

        self.prefix_changed = true;
        debug!("Removed candidate {} for {} from {}", id, prefix, originator);
        true
    }

    /// Refresh a candidate with the originator's current next hop and
    /// metric and stamp it with the current version.
    pub fn update_candidate(
        &mut self,
        id: PathId,
        next_hop: NextHop,
        metric: Metric,
    ) -> Result<(), RibError> {
        if metric.cost == ROUTE_COST_BROKEN {
            return Err(RibError::UnreachableCost(id));
        }

        let path = self.paths.get_mut(&id).ok_or(RibError::UnknownPath(id))?;
        path.next_hop = Some(next_hop);
        path.metric = metric;
        path.version = self.version;

        if !path.linked {
            let dst = path.dst;
            self.entries
                .entry(dst)
                .or_insert_with(|| RtEntry::new(dst))
                .paths
                .insert(path.originator, id);
            path.linked = true;
            trace!("Relinked candidate {} for {}", id, dst);
        }
        Ok(())
    }

    /// Pick the best candidate of an entry.
    ///
    /// Only candidates that received a next hop compete. For a default route
    /// the winner becomes the tracked internet gateway. Returns `None` for an
    /// unknown prefix or when no candidate has been updated yet; the entry
    /// then has no best path and the gateway is left alone.
    ///
    /// # Panics
    ///
    /// Panics if the entry has no candidate paths.
    pub fn select_best(&mut self, prefix: &Prefix) -> Option<PathId> {
        let gateway = self.current_inet_gw;
        let lq_nat_thresh = self.config.lq_nat_thresh;
        let paths = &self.paths;
        let entry = self.entries.get_mut(prefix)?;
        assert!(
            !entry.paths.is_empty(),
            "best path selection on empty route entry {}",
            prefix
        );

        let best = entry
            .paths
            .values()
            .filter_map(|id| paths.get(id))
            .filter_map(|path| path.next_hop.map(|next_hop| (path, next_hop)))
            .min_by(|(a, _), (b, _)| compare_paths(a, b, gateway, lq_nat_thresh));

        let Some((best, next_hop)) = best else {
            entry.best = None;
            return None;
        };

        entry.selected = true;
        entry.best = Some(BestPath {
            path: best.id,
            originator: best.originator,
            next_hop,
            metric: best.metric,
        });

        if prefix.is_default() {
            if self.current_inet_gw != Some(best.id) {
                debug!("Internet gateway is now {}", best.originator);
            }
            self.current_inet_gw = Some(best.id);
        }
        Some(best.id)
    }

    /// Detach candidates older than `current_version` and drop entries left
    /// without candidates. Returns the removed entries with their last
    /// installed next hop.
    pub fn reap_stale(&mut self, current_version: u64) -> Vec<RtEntry> {
        let mut stale: Vec<PathId> = self
            .paths
            .values()
            .filter(|path| path.linked && path.version < current_version)
            .map(|path| path.id)
            .collect();
        stale.sort();

        for id in stale {
            let Some(path) = self.paths.get_mut(&id) else {
                continue;
            };
            path.linked = false;
            if let Some(entry) = self.entries.get_mut(&path.dst) {
                entry.paths.remove(&path.originator);
                if entry.best.is_some_and(|best| best.path == id) {
                    entry.best = None;
                }
            }
            if self.current_inet_gw == Some(id) {
                self.current_inet_gw = None;
            }
            trace!("Detached stale candidate {}", path);
        }

        let empty: Vec<Prefix> = self
            .entries
            .values()
            .filter(|entry| entry.paths.is_empty())
            .map(|entry| entry.dst)
            .collect();

        let mut removed = Vec::with_capacity(empty.len());
        for prefix in empty {
            if let Some(mut entry) = self.entries.remove(&prefix) {
                entry.best = None;
                debug!("Removed route entry {}", entry);
                removed.push(entry);
            }
        }
        removed
    }

    /// Start a new routing tree version
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Current routing tree version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Host route entry for an address
    pub fn lookup(&self, addr: IpAddr) -> Option<&RtEntry> {
        let len = self.config.family.max_prefix_len();
        self.entries.get(&Prefix::new(addr, len))
    }

    /// Entry for a prefix
    pub fn get(&self, prefix: &Prefix) -> Option<&RtEntry> {
        self.entries.get(prefix)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RtEntry> {
        self.entries.values_mut()
    }

    /// Entries in prefix order
    pub fn iter(&self) -> impl Iterator<Item = &RtEntry> {
        self.entries.values()
    }

    /// Number of route entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate path by handle
    pub fn path(&self, id: PathId) -> Result<&RtPath, RibError> {
        self.paths.get(&id).ok_or(RibError::UnknownPath(id))
    }

    /// Path currently serving the default route
    pub fn current_inet_gw(&self) -> Option<PathId> {
        self.current_inet_gw
    }

    /// Whether candidates were inserted or removed since the last call
    pub fn take_prefix_changes(&mut self) -> bool {
        std::mem::take(&mut self.prefix_changed)
    }

    /// Compare two entries by their best paths. Entries without a best path
    /// sort last.
    pub fn cmp_entries(&self, a: &RtEntry, b: &RtEntry) -> Ordering {
        let best_a = a.best.and_then(|best| self.paths.get(&best.path));
        let best_b = b.best.and_then(|best| self.paths.get(&best.path));
        match (best_a, best_b) {
            (Some(pa), Some(pb)) => compare_paths(pa, pb, None, 1.0),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Dump the full table at trace level
    pub fn log_table(&self) {
        trace!("Routing table version {}:", self.version);
        for entry in self.entries.values() {
            trace!("  {}", entry);
            for id in entry.paths.values() {
                if let Some(path) = self.paths.get(id) {
                    trace!("    {}", path);
                }
            }
        }
    }

    /// Get RIB statistics
    pub fn get_stats(&self) -> RibStats {
        RibStats {
            version: self.version,
            entries: self.entries.len(),
            paths: self.paths.len(),
            linked_paths: self.paths.values().filter(|path| path.linked).count(),
        }
    }
}

impl Default for Rib {
    fn default() -> Self {
        Self::new(RibConfig::default())
    }
}
