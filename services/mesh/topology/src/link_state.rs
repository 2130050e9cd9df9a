//! Per-originator topology entries and the prefix index anchored at them.

use crate::prefix::Prefix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Link cost (ETX-derived path cost)
pub type LinkCost = u32;

/// Cost of a path the SPF run could not complete
pub const ROUTE_COST_BROKEN: LinkCost = u32::MAX;

/// Handle of a candidate path.
///
/// Allocated by the RIB and stored in the originator's prefix index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rtp#{}", self.0)
    }
}

/// First-hop link towards an originator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NextHop {
    /// Neighbor interface address used as gateway
    pub gateway: IpAddr,
    /// Local egress interface index
    pub if_index: u32,
}

impl NextHop {
    /// Create a new next hop
    pub fn new(gateway: IpAddr, if_index: u32) -> Self {
        Self { gateway, if_index }
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dev #{}", self.gateway, self.if_index)
    }
}

/// Topology entry for one originator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcEntry {
    /// Originator main address
    pub addr: IpAddr,
    /// Path cost from the last SPF run
    pub path_cost: LinkCost,
    /// Hop count from the last SPF run
    pub hops: u8,
    /// First-hop link from the last SPF run
    pub next_hop: Option<NextHop>,
    /// Candidate paths anchored here, one per advertised prefix
    prefixes: BTreeMap<Prefix, PathId>,
}

impl TcEntry {
    /// Create an entry that SPF has not reached yet
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            path_cost: ROUTE_COST_BROKEN,
            hops: 0,
            next_hop: None,
            prefixes: BTreeMap::new(),
        }
    }

    /// Whether the last SPF run found a usable path to this originator
    pub fn is_reachable(&self) -> bool {
        self.path_cost != ROUTE_COST_BROKEN && self.next_hop.is_some()
    }

    /// Candidate path anchored for a prefix
    pub fn prefix(&self, prefix: &Prefix) -> Option<PathId> {
        self.prefixes.get(prefix).copied()
    }

    /// All anchored candidate paths in prefix order
    pub fn paths(&self) -> impl Iterator<Item = (&Prefix, &PathId)> {
        self.prefixes.iter()
    }

    /// Number of anchored candidate paths
    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    /// Anchor a candidate path. Returns the path previously anchored for
    /// the prefix, if any.
    pub fn anchor_prefix(&mut self, prefix: Prefix, path: PathId) -> Option<PathId> {
        self.prefixes.insert(prefix, path)
    }

    /// Drop the anchor for a prefix
    pub fn release_prefix(&mut self, prefix: &Prefix) -> Option<PathId> {
        self.prefixes.remove(prefix)
    }
}

/// Set of topology entries keyed by originator address
#[derive(Debug, Default)]
pub struct TopologyDatabase {
    /// Entries in originator address order
    entries: BTreeMap<IpAddr, TcEntry>,
}

// Include implementation
mod database;
pub use database::TopologyStats;
