//! Neighbor table: one-hop neighbors, two-hop neighbors and the links between them

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;

/// Advertised willingness of a neighbor to act as relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Willingness(u8);

impl Willingness {
    /// Never selected as relay
    pub const NEVER: Willingness = Willingness(0);
    /// Low willingness
    pub const LOW: Willingness = Willingness(1);
    /// Default willingness
    pub const DEFAULT: Willingness = Willingness(3);
    /// High willingness
    pub const HIGH: Willingness = Willingness(6);
    /// Always selected as relay
    pub const ALWAYS: Willingness = Willingness(7);

    /// Create a willingness value, clamped to [`Willingness::ALWAYS`]
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::ALWAYS.0))
    }

    /// Raw ordinal
    pub fn value(self) -> u8 {
        self.0
    }

    /// Tiers considered by the greedy pass, highest first
    /// (`ALWAYS - 1` down to `NEVER + 1`)
    pub fn selection_tiers() -> impl Iterator<Item = Willingness> {
        (Self::NEVER.0 + 1..Self::ALWAYS.0).rev().map(Willingness)
    }

    /// Same tiers, lowest first
    pub fn optimization_tiers() -> impl Iterator<Item = Willingness> {
        (Self::NEVER.0 + 1..Self::ALWAYS.0).map(Willingness)
    }
}

impl From<u8> for Willingness {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Willingness> for u8 {
    fn from(willingness: Willingness) -> Self {
        willingness.0
    }
}

impl Default for Willingness {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Willingness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NEVER => write!(f, "never"),
            Self::LOW => write!(f, "low"),
            Self::DEFAULT => write!(f, "default"),
            Self::HIGH => write!(f, "high"),
            Self::ALWAYS => write!(f, "always"),
            Self(value) => write!(f, "{}", value),
        }
    }
}

/// Symmetry of the link to a one-hop neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Bidirectional link verified
    Sym,
    /// Heard only, or lost
    NotSym,
}

/// Neighbor table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NeighborError {
    /// No one-hop neighbor with this address
    #[error("unknown neighbor {0}")]
    UnknownNeighbor(IpAddr),
    /// A neighbor cannot be its own two-hop neighbor
    #[error("neighbor {0} cannot reach itself as two-hop neighbor")]
    SelfLink(IpAddr),
}

/// One-hop neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    /// Main address
    pub main_addr: IpAddr,
    /// Link symmetry
    pub status: LinkStatus,
    /// Advertised willingness
    pub willingness: Willingness,
    /// Selected as relay in the current set
    pub is_mpr: bool,
    /// Was a relay before the current recomputation started
    pub was_mpr: bool,
    /// Two-hop neighbors reached through this neighbor that are still below
    /// the coverage threshold
    pub uncovered_two_hop_count: usize,
    two_hop: BTreeSet<IpAddr>,
}

impl NeighborEntry {
    fn new(main_addr: IpAddr, status: LinkStatus, willingness: Willingness) -> Self {
        Self {
            main_addr,
            status,
            willingness,
            is_mpr: false,
            was_mpr: false,
            uncovered_two_hop_count: 0,
            two_hop: BTreeSet::new(),
        }
    }

    /// Whether the link is symmetric
    pub fn is_symmetric(&self) -> bool {
        self.status == LinkStatus::Sym
    }

    /// Two-hop neighbors reachable through this neighbor
    pub fn two_hop_neighbors(&self) -> impl Iterator<Item = &IpAddr> {
        self.two_hop.iter()
    }

    /// Number of two-hop links
    pub fn two_hop_count(&self) -> usize {
        self.two_hop.len()
    }
}

/// Two-hop neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoHopNeighborEntry {
    /// Two-hop address
    pub addr: IpAddr,
    /// Number of selected relays currently reaching it
    pub covered_count: usize,
    /// Already counted in the current recomputation
    pub processed: bool,
    one_hop: BTreeSet<IpAddr>,
}

impl TwoHopNeighborEntry {
    fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            covered_count: 0,
            processed: false,
            one_hop: BTreeSet::new(),
        }
    }

    /// One-hop neighbors this two-hop neighbor is reachable through
    pub fn one_hop_neighbors(&self) -> impl Iterator<Item = &IpAddr> {
        self.one_hop.iter()
    }

    /// Number of links reaching this two-hop neighbor
    pub fn link_count(&self) -> usize {
        self.one_hop.len()
    }
}

/// Adjacency between a one-hop and a two-hop neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TwoHopLink {
    /// One-hop neighbor
    pub neighbor: IpAddr,
    /// Two-hop neighbor reached through it
    pub two_hop: IpAddr,
}

/// One-hop and two-hop neighbor sets.
///
/// Both sets iterate in address order, which is also the order the MPR
/// selector visits candidates in.
#[derive(Debug, Default, Clone)]
pub struct NeighborTable {
    neighbors: BTreeMap<IpAddr, NeighborEntry>,
    two_hop: BTreeMap<IpAddr, TwoHopNeighborEntry>,
}

impl NeighborTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a one-hop neighbor, or update status and willingness of a known
    /// one. Returns true if the neighbor is new.
    pub fn add_neighbor(&mut self, addr: IpAddr, status: LinkStatus, willingness: Willingness) -> bool {
        match self.neighbors.get_mut(&addr) {
            Some(entry) => {
                entry.status = status;
                entry.willingness = willingness;
                false
            }
            None => {
                debug!("Added neighbor {} ({:?}, willingness {})", addr, status, willingness);
                self.neighbors
                    .insert(addr, NeighborEntry::new(addr, status, willingness));
                true
            }
        }
    }

    /// Remove a one-hop neighbor and every two-hop link through it.
    /// Two-hop neighbors left without links are dropped.
    pub fn remove_neighbor(&mut self, addr: &IpAddr) -> Option<NeighborEntry> {
        let entry = self.neighbors.remove(addr)?;

        for two_hop in &entry.two_hop {
            self.unlink_two_hop(addr, two_hop);
        }

        debug!("Removed neighbor {} ({} two-hop links)", addr, entry.two_hop.len());
        Some(entry)
    }

    /// Change a neighbor's willingness
    pub fn set_willingness(&mut self, addr: &IpAddr, willingness: Willingness) -> Result<(), NeighborError> {
        let entry = self
            .neighbors
            .get_mut(addr)
            .ok_or(NeighborError::UnknownNeighbor(*addr))?;
        entry.willingness = willingness;
        Ok(())
    }

    /// Change a neighbor's link symmetry
    pub fn set_status(&mut self, addr: &IpAddr, status: LinkStatus) -> Result<(), NeighborError> {
        let entry = self
            .neighbors
            .get_mut(addr)
            .ok_or(NeighborError::UnknownNeighbor(*addr))?;
        entry.status = status;
        Ok(())
    }

    /// Record that `two_hop` is reachable through `neighbor`.
    /// Returns true if the link is new.
    pub fn add_two_hop_link(&mut self, neighbor: IpAddr, two_hop: IpAddr) -> Result<bool, NeighborError> {
        if neighbor == two_hop {
            return Err(NeighborError::SelfLink(neighbor));
        }

        let entry = self
            .neighbors
            .get_mut(&neighbor)
            .ok_or(NeighborError::UnknownNeighbor(neighbor))?;

        if !entry.two_hop.insert(two_hop) {
            return Ok(false);
        }

        self.two_hop
            .entry(two_hop)
            .or_insert_with(|| TwoHopNeighborEntry::new(two_hop))
            .one_hop
            .insert(neighbor);

        Ok(true)
    }

    /// Remove a two-hop link. Returns true if the link existed.
    pub fn remove_two_hop_link(&mut self, neighbor: &IpAddr, two_hop: &IpAddr) -> bool {
        let removed = self
            .neighbors
            .get_mut(neighbor)
            .map(|entry| entry.two_hop.remove(two_hop))
            .unwrap_or(false);

        if removed {
            self.unlink_two_hop(neighbor, two_hop);
        }
        removed
    }

    fn unlink_two_hop(&mut self, neighbor: &IpAddr, two_hop: &IpAddr) {
        if let Some(entry) = self.two_hop.get_mut(two_hop) {
            entry.one_hop.remove(neighbor);
            if entry.one_hop.is_empty() {
                self.two_hop.remove(two_hop);
            }
        }
    }

    /// Look up a one-hop neighbor
    pub fn neighbor(&self, addr: &IpAddr) -> Option<&NeighborEntry> {
        self.neighbors.get(addr)
    }

    /// Look up a two-hop neighbor
    pub fn two_hop_neighbor(&self, addr: &IpAddr) -> Option<&TwoHopNeighborEntry> {
        self.two_hop.get(addr)
    }

    /// Whether an address is a symmetric one-hop neighbor
    pub fn is_symmetric_neighbor(&self, addr: &IpAddr) -> bool {
        self.neighbors
            .get(addr)
            .is_some_and(NeighborEntry::is_symmetric)
    }

    /// One-hop neighbors in address order
    pub fn neighbors(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.neighbors.values()
    }

    /// Two-hop neighbors in address order
    pub fn two_hop_neighbors(&self) -> impl Iterator<Item = &TwoHopNeighborEntry> {
        self.two_hop.values()
    }

    /// All two-hop links, ordered by neighbor then two-hop address
    pub fn links(&self) -> impl Iterator<Item = TwoHopLink> + '_ {
        self.neighbors.values().flat_map(|entry| {
            entry.two_hop.iter().map(move |two_hop| TwoHopLink {
                neighbor: entry.main_addr,
                two_hop: *two_hop,
            })
        })
    }

    /// Number of one-hop neighbors
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether there are no one-hop neighbors
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Number of two-hop neighbors
    pub fn two_hop_len(&self) -> usize {
        self.two_hop.len()
    }

    /// Addresses of the currently selected relays, in address order
    pub fn mpr_set(&self) -> Vec<IpAddr> {
        self.neighbors
            .values()
            .filter(|entry| entry.is_mpr)
            .map(|entry| entry.main_addr)
            .collect()
    }

    pub(crate) fn neighbor_mut(&mut self, addr: &IpAddr) -> Option<&mut NeighborEntry> {
        self.neighbors.get_mut(addr)
    }

    pub(crate) fn two_hop_mut(&mut self, addr: &IpAddr) -> Option<&mut TwoHopNeighborEntry> {
        self.two_hop.get_mut(addr)
    }

    pub(crate) fn neighbors_mut(&mut self) -> impl Iterator<Item = &mut NeighborEntry> {
        self.neighbors.values_mut()
    }

    pub(crate) fn two_hop_neighbors_mut(&mut self) -> impl Iterator<Item = &mut TwoHopNeighborEntry> {
        self.two_hop.values_mut()
    }
}
