//! TopologyDatabase implementation methods.

use super::{LinkCost, NextHop, TcEntry, TopologyDatabase, ROUTE_COST_BROKEN};
use std::net::IpAddr;
use tracing::{debug, info};

impl TopologyDatabase {
    /// Create an empty topology database
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an originator's entry
    pub fn lookup(&self, originator: &IpAddr) -> Option<&TcEntry> {
        self.entries.get(originator)
    }

    /// Look up an originator's entry for modification
    pub fn lookup_mut(&mut self, originator: &IpAddr) -> Option<&mut TcEntry> {
        self.entries.get_mut(originator)
    }

    /// Find the entry for an originator, creating an unreachable one if
    /// the originator is not known yet
    pub fn locate(&mut self, originator: IpAddr) -> &mut TcEntry {
        self.entries.entry(originator).or_insert_with(|| {
            debug!("Created topology entry for originator {}", originator);
            TcEntry::new(originator)
        })
    }

    /// Record the SPF result for an originator.
    ///
    /// A broken cost is recorded as unreachable. Returns true if the
    /// entry's cost, hop count or next hop changed.
    pub fn set_reachability(
        &mut self,
        originator: IpAddr,
        path_cost: LinkCost,
        hops: u8,
        next_hop: NextHop,
    ) -> bool {
        if path_cost == ROUTE_COST_BROKEN {
            return self.set_unreachable(&originator);
        }

        let entry = self.locate(originator);
        let changed = entry.path_cost != path_cost
            || entry.hops != hops
            || entry.next_hop != Some(next_hop);

        entry.path_cost = path_cost;
        entry.hops = hops;
        entry.next_hop = Some(next_hop);

        if changed {
            debug!(
                "Originator {} reachable via {} (cost: {}, hops: {})",
                originator, next_hop.gateway, path_cost, hops
            );
        }
        changed
    }

    /// Mark an originator unreachable. Its anchored prefixes stay in place
    /// so they come back once SPF reaches it again.
    pub fn set_unreachable(&mut self, originator: &IpAddr) -> bool {
        match self.entries.get_mut(originator) {
            Some(entry) if entry.is_reachable() => {
                entry.path_cost = ROUTE_COST_BROKEN;
                entry.hops = 0;
                entry.next_hop = None;
                debug!("Originator {} is unreachable", originator);
                true
            }
            _ => false,
        }
    }

    /// Iterate all entries in originator address order
    pub fn entries(&self) -> impl Iterator<Item = &TcEntry> {
        self.entries.values()
    }

    /// Iterate reachable entries in originator address order
    pub fn reachable(&self) -> impl Iterator<Item = &TcEntry> {
        self.entries.values().filter(|entry| entry.is_reachable())
    }

    /// Number of known originators
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no originator is known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries that are unreachable and anchor no candidate paths
    pub fn cleanup_unreferenced(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.is_reachable() || entry.prefix_count() > 0);
        let removed = before - self.entries.len();

        if removed > 0 {
            info!("Cleaned up {} unreferenced topology entries", removed);
        }
        removed
    }

    /// Get topology statistics
    pub fn get_stats(&self) -> TopologyStats {
        TopologyStats {
            total_entries: self.entries.len(),
            reachable_entries: self.reachable().count(),
            anchored_paths: self.entries.values().map(TcEntry::prefix_count).sum(),
        }
    }
}

/// Topology database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyStats {
    /// Total number of known originators
    pub total_entries: usize,
    /// Originators with a usable SPF path
    pub reachable_entries: usize,
    /// Candidate paths anchored across all originators
    pub anchored_paths: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PathId, Prefix};

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_locate_creates_unreachable_entry() {
        let mut db = TopologyDatabase::new();
        let entry = db.locate(addr("10.0.0.1"));
        assert_eq!(entry.path_cost, ROUTE_COST_BROKEN);
        assert!(!entry.is_reachable());
        assert_eq!(db.len(), 1);

        // second locate returns the same entry
        db.locate(addr("10.0.0.1")).hops = 3;
        assert_eq!(db.len(), 1);
        assert_eq!(db.lookup(&addr("10.0.0.1")).unwrap().hops, 3);
    }

    #[test]
    fn test_set_reachability() {
        let mut db = TopologyDatabase::new();
        let nh = NextHop::new(addr("10.0.0.2"), 1);

        assert!(db.set_reachability(addr("10.0.0.9"), 20, 2, nh));
        assert!(!db.set_reachability(addr("10.0.0.9"), 20, 2, nh));
        assert!(db.set_reachability(addr("10.0.0.9"), 30, 2, nh));

        let entry = db.lookup(&addr("10.0.0.9")).unwrap();
        assert!(entry.is_reachable());
        assert_eq!(entry.path_cost, 30);
        assert_eq!(entry.next_hop, Some(nh));

        // broken cost means unreachable
        assert!(db.set_reachability(addr("10.0.0.9"), ROUTE_COST_BROKEN, 2, nh));
        assert!(!db.lookup(&addr("10.0.0.9")).unwrap().is_reachable());
        assert!(!db.set_unreachable(&addr("10.0.0.9")));
    }

    #[test]
    fn test_cleanup_keeps_anchored_entries() {
        let mut db = TopologyDatabase::new();
        db.locate(addr("10.0.0.1"));
        db.locate(addr("10.0.0.2"))
            .anchor_prefix(Prefix::host(addr("10.1.0.1")), PathId(7));
        db.set_reachability(addr("10.0.0.3"), 10, 1, NextHop::new(addr("10.0.0.3"), 1));

        assert_eq!(db.cleanup_unreferenced(), 1);
        assert!(db.lookup(&addr("10.0.0.1")).is_none());
        assert!(db.lookup(&addr("10.0.0.2")).is_some());
        assert!(db.lookup(&addr("10.0.0.3")).is_some());

        let stats = db.get_stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.reachable_entries, 1);
        assert_eq!(stats.anchored_paths, 1);
    }

    #[test]
    fn test_prefix_anchor() {
        let mut entry = TcEntry::new(addr("10.0.0.1"));
        let prefix: Prefix = "192.168.0.0/16".parse().unwrap();

        assert_eq!(entry.anchor_prefix(prefix, PathId(1)), None);
        assert_eq!(entry.prefix(&prefix), Some(PathId(1)));
        assert_eq!(entry.prefix_count(), 1);
        assert_eq!(entry.release_prefix(&prefix), Some(PathId(1)));
        assert_eq!(entry.prefix(&prefix), None);
    }

    #[test]
    fn test_next_hop_serialization() {
        let nh = NextHop::new(addr("10.0.0.2"), 4);
        let json = serde_json::to_string(&nh).unwrap();
        let back: NextHop = serde_json::from_str(&json).unwrap();
        assert_eq!(nh, back);
        assert_eq!(nh.to_string(), "10.0.0.2 dev #4");
    }
}
