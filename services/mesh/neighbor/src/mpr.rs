//! Multipoint relay selection.
//!
//! Greedy weighted set cover over the neighbor table (RFC 3626 section 8.3.1):
//!
//! 1. clear the previous selection and all coverage counters
//! 2. count the two-hop neighborhood to cover
//! 3. select every `WILL_ALWAYS` neighbor
//! 4. per willingness tier, highest first: select neighbors that are the only
//!    way to reach some two-hop neighbor, then the neighbor covering the most
//!    two-hop neighbors still below the threshold, until everything is covered
//! 5. drop relays whose two-hop neighbors are all covered more than enough
//!
//! Two-hop neighbors that are symmetric one-hop neighbors themselves are never
//! part of the cover.

use crate::table::{NeighborTable, Willingness};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::{debug, info, trace};

/// MPR selection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MprConfig {
    /// Number of distinct relays every two-hop neighbor must be reached by
    pub mpr_coverage: usize,
    /// TC redundancy level; a changed relay set is only signalled when > 0
    pub tc_redundancy: u8,
}

impl Default for MprConfig {
    fn default() -> Self {
        Self {
            mpr_coverage: 1,
            tc_redundancy: 2,
        }
    }
}

impl MprConfig {
    /// Coverage threshold, at least one relay
    pub fn coverage(&self) -> usize {
        self.mpr_coverage.max(1)
    }
}

/// Receives the "links changed" signal raised when the relay set shrinks
pub trait LinkChangeNotifier {
    /// Links changed; `force` requests an immediate topology advertisement
    fn signal_link_changes(&mut self, force: bool);
}

impl<F: FnMut(bool)> LinkChangeNotifier for F {
    fn signal_link_changes(&mut self, force: bool) {
        self(force)
    }
}

/// Notifier that drops the signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl LinkChangeNotifier for NoopNotifier {
    fn signal_link_changes(&mut self, _force: bool) {}
}

/// Relay set before and after one recomputation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MprTransition {
    /// Relays newly selected
    pub added: Vec<IpAddr>,
    /// Relays no longer selected
    pub removed: Vec<IpAddr>,
}

impl MprTransition {
    fn between(before: &BTreeSet<IpAddr>, after: &BTreeSet<IpAddr>) -> Self {
        Self {
            added: after.difference(before).copied().collect(),
            removed: before.difference(after).copied().collect(),
        }
    }

    /// Whether the set is unchanged
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes the relay set of a neighbor table
#[derive(Debug, Clone, Default)]
pub struct MprSelector {
    config: MprConfig,
    last_transition: MprTransition,
}

impl MprSelector {
    /// Create a selector
    pub fn new(config: MprConfig) -> Self {
        Self {
            config,
            last_transition: MprTransition::default(),
        }
    }

    /// Selection parameters
    pub fn config(&self) -> &MprConfig {
        &self.config
    }

    /// Replace the selection parameters; takes effect on the next run
    pub fn set_config(&mut self, config: MprConfig) {
        self.config = config;
    }

    /// Relays added and removed by the last recomputation
    pub fn last_transition(&self) -> &MprTransition {
        &self.last_transition
    }

    /// Recompute the relay set.
    ///
    /// Returns true if a previously selected relay was dropped. In that case,
    /// and only with TC redundancy enabled, the notifier is told to force a
    /// topology advertisement.
    pub fn recompute_mpr_set<N>(&mut self, table: &mut NeighborTable, notifier: &mut N) -> bool
    where
        N: LinkChangeNotifier + ?Sized,
    {
        trace!("Recalculating MPR set");
        let before: BTreeSet<IpAddr> = table.mpr_set().into_iter().collect();

        clear_mprs(table);
        let two_hop_count = self.count_two_hop_neighbors(table);
        let mut covered = self.add_will_always_nodes(table);

        'tiers: for willingness in Willingness::selection_tiers() {
            for candidate in sole_link_neighbors(table, willingness) {
                let already = table.neighbor(&candidate).is_some_and(|n| n.is_mpr);
                if !already {
                    covered += self.choose(table, &candidate);
                }
            }

            if covered >= two_hop_count {
                break;
            }

            while let Some(candidate) = find_maximum_covered(table, willingness) {
                covered += self.choose(table, &candidate);

                if covered >= two_hop_count {
                    break 'tiers;
                }
            }
        }

        self.optimize_mpr_set(table);

        let after: BTreeSet<IpAddr> = table.mpr_set().into_iter().collect();
        self.last_transition = MprTransition::between(&before, &after);

        let changed = check_mpr_changes(table);
        if changed {
            info!(
                component = "mpr",
                "MPR set changed: {} relays (+{} -{})",
                after.len(),
                self.last_transition.added.len(),
                self.last_transition.removed.len()
            );
            if self.config.tc_redundancy > 0 {
                notifier.signal_link_changes(true);
            }
        } else if !self.last_transition.is_empty() {
            debug!("MPR set grew to {} relays", after.len());
        }

        changed
    }

    /// Drop relays whose every two-hop neighbor is covered more than
    /// `mpr_coverage` times. `WILL_ALWAYS` relays are kept.
    ///
    /// Coverage counters are lowered as relays are dropped, so running this
    /// again on its own result changes nothing.
    pub fn optimize_mpr_set(&self, table: &mut NeighborTable) {
        let coverage = self.config.coverage();

        for willingness in Willingness::optimization_tiers() {
            let relays: Vec<IpAddr> = table
                .neighbors()
                .filter(|n| n.willingness == willingness && n.is_mpr)
                .map(|n| n.main_addr)
                .collect();

            for relay in relays {
                let reached = eligible_two_hops(table, &relay);
                let removable = reached.iter().all(|two_hop| {
                    table
                        .two_hop_neighbor(two_hop)
                        .is_some_and(|entry| entry.covered_count > coverage)
                });

                if !removable {
                    continue;
                }

                debug!("MPR optimize: removing relay {}", relay);
                if let Some(entry) = table.neighbor_mut(&relay) {
                    entry.is_mpr = false;
                }
                for two_hop in &reached {
                    if let Some(entry) = table.two_hop_mut(two_hop) {
                        entry.covered_count = entry.covered_count.saturating_sub(1);
                    }
                }
            }
        }
    }

    /// Count the distinct two-hop neighbors to cover and seed every
    /// symmetric neighbor's uncovered counter.
    fn count_two_hop_neighbors(&self, table: &mut NeighborTable) -> usize {
        for entry in table.two_hop_neighbors_mut() {
            entry.processed = false;
        }

        let addrs: Vec<IpAddr> = table.neighbors().map(|n| n.main_addr).collect();
        let mut total = 0;

        for addr in addrs {
            let symmetric = table.is_symmetric_neighbor(&addr);
            let reached = if symmetric {
                eligible_two_hops(table, &addr)
            } else {
                Vec::new()
            };

            for two_hop in &reached {
                if let Some(entry) = table.two_hop_mut(two_hop) {
                    if !entry.processed {
                        entry.processed = true;
                        total += 1;
                    }
                }
            }

            if let Some(entry) = table.neighbor_mut(&addr) {
                entry.uncovered_two_hop_count = reached.len();
            }
        }

        trace!("Two hop neighbors: {}", total);
        total
    }

    fn add_will_always_nodes(&self, table: &mut NeighborTable) -> usize {
        let always: Vec<IpAddr> = table
            .neighbors()
            .filter(|n| n.is_symmetric() && n.willingness == Willingness::ALWAYS)
            .map(|n| n.main_addr)
            .collect();

        always
            .iter()
            .map(|addr| {
                trace!("Adding WILL_ALWAYS relay {}", addr);
                self.choose(table, addr)
            })
            .sum()
    }

    /// Select a relay and update coverage. Returns how many two-hop
    /// neighbors reached the coverage threshold through this relay.
    fn choose(&self, table: &mut NeighborTable, relay: &IpAddr) -> usize {
        let coverage = self.config.coverage();
        debug!("Setting {} as MPR", relay);

        match table.neighbor_mut(relay) {
            Some(entry) => entry.is_mpr = true,
            None => return 0,
        }

        let mut newly_covered = 0;
        for two_hop in eligible_two_hops(table, relay) {
            let sharing: Vec<IpAddr> = match table.two_hop_mut(&two_hop) {
                Some(entry) => {
                    let was_covered = entry.covered_count >= coverage;
                    entry.covered_count += 1;
                    if was_covered || entry.covered_count < coverage {
                        continue;
                    }
                    entry.one_hop_neighbors().copied().collect()
                }
                None => continue,
            };

            newly_covered += 1;
            for neighbor in sharing {
                if let Some(entry) = table.neighbor_mut(&neighbor) {
                    if entry.is_symmetric() {
                        entry.uncovered_two_hop_count =
                            entry.uncovered_two_hop_count.saturating_sub(1);
                    }
                }
            }
        }

        newly_covered
    }
}

/// Two-hop neighbors of `relay` that count towards the cover
fn eligible_two_hops(table: &NeighborTable, relay: &IpAddr) -> Vec<IpAddr> {
    table
        .neighbor(relay)
        .map(|entry| {
            entry
                .two_hop_neighbors()
                .filter(|two_hop| !table.is_symmetric_neighbor(two_hop))
                .copied()
                .collect()
        })
        .unwrap_or_default()
}

fn clear_mprs(table: &mut NeighborTable) {
    for entry in table.neighbors_mut() {
        if entry.is_mpr {
            entry.was_mpr = true;
            entry.is_mpr = false;
        }
    }
    for entry in table.two_hop_neighbors_mut() {
        entry.covered_count = 0;
    }
}

/// Neighbors of the given willingness that are the only symmetric link to
/// some two-hop neighbor
fn sole_link_neighbors(table: &NeighborTable, willingness: Willingness) -> Vec<IpAddr> {
    let mut found = BTreeSet::new();

    for two_hop in table.two_hop_neighbors() {
        if table.is_symmetric_neighbor(&two_hop.addr) {
            continue;
        }

        let mut links = two_hop
            .one_hop_neighbors()
            .filter(|addr| table.is_symmetric_neighbor(addr));

        if let (Some(only), None) = (links.next(), links.next()) {
            let matches = table
                .neighbor(only)
                .is_some_and(|n| n.willingness == willingness);
            if matches {
                found.insert(*only);
            }
        }
    }

    found.into_iter().collect()
}

/// Unselected symmetric neighbor of the given willingness with the most
/// two-hop neighbors still below the threshold. Ties go to the lowest
/// address.
fn find_maximum_covered(table: &NeighborTable, willingness: Willingness) -> Option<IpAddr> {
    let mut maximum = 0;
    let mut candidate = None;

    for entry in table.neighbors() {
        if !entry.is_mpr
            && entry.is_symmetric()
            && entry.willingness == willingness
            && entry.uncovered_two_hop_count > maximum
        {
            maximum = entry.uncovered_two_hop_count;
            candidate = Some(entry.main_addr);
        }
    }

    candidate
}

/// Clear `was_mpr` and report whether any former relay lost its selection
fn check_mpr_changes(table: &mut NeighborTable) -> bool {
    let mut changed = false;
    for entry in table.neighbors_mut() {
        if entry.was_mpr {
            entry.was_mpr = false;
            if !entry.is_mpr {
                changed = true;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LinkStatus;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn selector(coverage: usize) -> MprSelector {
        MprSelector::new(MprConfig {
            mpr_coverage: coverage,
            tc_redundancy: 2,
        })
    }

    fn sym(table: &mut NeighborTable, a: &str, willingness: Willingness) {
        table.add_neighbor(addr(a), LinkStatus::Sym, willingness);
    }

    fn link(table: &mut NeighborTable, n: &str, two_hop: &str) {
        table.add_two_hop_link(addr(n), addr(two_hop)).unwrap();
    }

    fn mprs(table: &NeighborTable) -> Vec<IpAddr> {
        table.mpr_set()
    }

    /// Every coverable two-hop neighbor is covered `coverage` times, or all
    /// of its selectable neighbors are relays.
    fn assert_covered(table: &NeighborTable, coverage: usize) {
        for two_hop in table.two_hop_neighbors() {
            if table.is_symmetric_neighbor(&two_hop.addr) {
                continue;
            }
            let selectable: Vec<&IpAddr> = two_hop
                .one_hop_neighbors()
                .filter(|a| {
                    table
                        .neighbor(a)
                        .is_some_and(|n| n.is_symmetric() && n.willingness != Willingness::NEVER)
                })
                .collect();
            if selectable.is_empty() {
                continue;
            }
            let relays = selectable
                .iter()
                .filter(|a| table.neighbor(a).is_some_and(|n| n.is_mpr))
                .count();
            assert!(
                relays >= coverage.min(selectable.len()),
                "{} covered by {} of {} relays",
                two_hop.addr,
                relays,
                selectable.len()
            );
            assert_eq!(two_hop.covered_count, relays);
        }
    }

    #[test]
    fn test_will_always_and_greedy_pick() {
        // A always, B and C default, X only behind B and C
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::ALWAYS);
        sym(&mut table, "10.0.0.2", Willingness::DEFAULT);
        sym(&mut table, "10.0.0.3", Willingness::DEFAULT);
        link(&mut table, "10.0.0.2", "10.0.1.1");
        link(&mut table, "10.0.0.3", "10.0.1.1");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);

        let selected = mprs(&table);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains(&addr("10.0.0.1")));
        // exactly one of B and C; ties resolve to the lower address
        assert!(selected.contains(&addr("10.0.0.2")));
        assert!(!selected.contains(&addr("10.0.0.3")));
        assert_eq!(
            table.two_hop_neighbor(&addr("10.0.1.1")).unwrap().covered_count,
            1
        );
    }

    #[test]
    fn test_sole_link_is_forced() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::LOW);
        sym(&mut table, "10.0.0.2", Willingness::HIGH);
        link(&mut table, "10.0.0.1", "10.0.1.1");
        link(&mut table, "10.0.0.2", "10.0.1.2");
        link(&mut table, "10.0.0.2", "10.0.1.3");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);

        // the low-willingness neighbor is the only way to 10.0.1.1
        assert_eq!(mprs(&table), vec![addr("10.0.0.1"), addr("10.0.0.2")]);
        assert_covered(&table, 1);
    }

    #[test]
    fn test_sole_link_wins_at_any_position_and_tier() {
        // numeric and textual address order differ
        let neighbors = ["10.0.0.9", "10.0.0.10", "10.0.0.100", "172.16.0.1", "192.168.0.1"];
        let tiers = [Willingness::LOW, Willingness::DEFAULT, Willingness::HIGH];

        for forced in neighbors {
            for shift in 0..tiers.len() {
                let mut table = NeighborTable::new();
                for (i, n) in neighbors.iter().enumerate() {
                    sym(&mut table, n, tiers[(i + shift) % tiers.len()]);
                    link(&mut table, n, "10.0.1.1");
                }
                // the forced neighbor is the only way to 10.0.1.9
                link(&mut table, forced, "10.0.1.9");

                let mut mpr = selector(1);
                mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
                assert_eq!(
                    mprs(&table),
                    vec![addr(forced)],
                    "forced {} with tier shift {}",
                    forced,
                    shift
                );
            }
        }
    }

    #[test]
    fn test_symmetric_one_hop_excluded_from_cover() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::DEFAULT);
        sym(&mut table, "10.0.0.2", Willingness::DEFAULT);
        // 10.0.0.2 is advertised as two-hop through 10.0.0.1 but is direct
        link(&mut table, "10.0.0.1", "10.0.0.2");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);

        assert!(mprs(&table).is_empty());
        assert_eq!(table.neighbor(&addr("10.0.0.1")).unwrap().uncovered_two_hop_count, 0);
    }

    #[test]
    fn test_not_symmetric_neighbor_never_selected() {
        let mut table = NeighborTable::new();
        table.add_neighbor(addr("10.0.0.1"), LinkStatus::NotSym, Willingness::ALWAYS);
        table.add_neighbor(addr("10.0.0.2"), LinkStatus::NotSym, Willingness::HIGH);
        link(&mut table, "10.0.0.2", "10.0.1.1");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
        assert!(mprs(&table).is_empty());
    }

    #[test]
    fn test_will_never_not_selected() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::NEVER);
        link(&mut table, "10.0.0.1", "10.0.1.1");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
        assert!(mprs(&table).is_empty());
    }

    #[test]
    fn test_higher_willingness_preferred() {
        // both cover the same two-hop neighbors, the high tier goes first
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::LOW);
        sym(&mut table, "10.0.0.2", Willingness::HIGH);
        for two_hop in ["10.0.1.1", "10.0.1.2"] {
            link(&mut table, "10.0.0.1", two_hop);
            link(&mut table, "10.0.0.2", two_hop);
        }

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
        assert_eq!(mprs(&table), vec![addr("10.0.0.2")]);
    }

    #[test]
    fn test_greedy_picks_maximum_coverage() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::DEFAULT);
        sym(&mut table, "10.0.0.2", Willingness::DEFAULT);
        sym(&mut table, "10.0.0.3", Willingness::DEFAULT);
        // .3 reaches everything .1 and .2 reach
        for two_hop in ["10.0.1.1", "10.0.1.2", "10.0.1.3"] {
            link(&mut table, "10.0.0.3", two_hop);
        }
        link(&mut table, "10.0.0.1", "10.0.1.1");
        link(&mut table, "10.0.0.1", "10.0.1.2");
        link(&mut table, "10.0.0.2", "10.0.1.2");
        link(&mut table, "10.0.0.2", "10.0.1.3");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
        assert_eq!(mprs(&table), vec![addr("10.0.0.3")]);
        assert_covered(&table, 1);
    }

    #[test]
    fn test_coverage_two() {
        let mut table = NeighborTable::new();
        for n in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            sym(&mut table, n, Willingness::DEFAULT);
            link(&mut table, n, "10.0.1.1");
        }
        link(&mut table, "10.0.0.3", "10.0.1.2");

        let mut mpr = selector(2);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);

        assert_eq!(mprs(&table).len(), 2);
        assert_covered(&table, 2);
        // 10.0.1.2 has a single neighbor, so one relay is all it can get
        assert!(table.neighbor(&addr("10.0.0.3")).unwrap().is_mpr);
    }

    #[test]
    fn test_full_coverage_on_larger_graph() {
        let mut table = NeighborTable::new();
        let willingness = [
            Willingness::LOW,
            Willingness::DEFAULT,
            Willingness::HIGH,
            Willingness::DEFAULT,
            Willingness::new(4),
            Willingness::LOW,
        ];
        for (i, w) in willingness.iter().enumerate() {
            sym(&mut table, &format!("10.0.0.{}", i + 1), *w);
        }
        for i in 0..6u8 {
            for j in 0..12u8 {
                if (i as u16 * 7 + j as u16 * 3) % 4 == 0 {
                    link(&mut table, &format!("10.0.0.{}", i + 1), &format!("10.0.2.{}", j + 1));
                }
            }
        }

        for coverage in 1..=3 {
            let mut mpr = selector(coverage);
            mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
            assert_covered(&table, coverage);
        }
    }

    #[test]
    fn test_optimize_removes_redundant_relay() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::LOW);
        sym(&mut table, "10.0.0.2", Willingness::HIGH);
        sym(&mut table, "10.0.0.3", Willingness::HIGH);
        link(&mut table, "10.0.0.1", "10.0.1.1");
        link(&mut table, "10.0.0.2", "10.0.1.1");
        link(&mut table, "10.0.0.2", "10.0.1.2");
        link(&mut table, "10.0.0.3", "10.0.1.1");
        link(&mut table, "10.0.0.3", "10.0.1.3");

        let mpr = selector(1);
        // hand-built over-selection: every neighbor is a relay
        for n in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            mpr.choose(&mut table, &addr(n));
        }
        assert_eq!(table.two_hop_neighbor(&addr("10.0.1.1")).unwrap().covered_count, 3);

        mpr.optimize_mpr_set(&mut table);
        // the low-willingness relay only adds redundancy
        assert_eq!(mprs(&table), vec![addr("10.0.0.2"), addr("10.0.0.3")]);
        assert_covered(&table, 1);

        // second run is a no-op
        mpr.optimize_mpr_set(&mut table);
        assert_eq!(mprs(&table), vec![addr("10.0.0.2"), addr("10.0.0.3")]);
    }

    #[test]
    fn test_optimize_keeps_last_cover() {
        // two relays both covering X twice over; only one may go
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::DEFAULT);
        sym(&mut table, "10.0.0.2", Willingness::DEFAULT);
        link(&mut table, "10.0.0.1", "10.0.1.1");
        link(&mut table, "10.0.0.2", "10.0.1.1");

        let mpr = selector(1);
        mpr.choose(&mut table, &addr("10.0.0.1"));
        mpr.choose(&mut table, &addr("10.0.0.2"));

        mpr.optimize_mpr_set(&mut table);
        assert_eq!(mprs(&table), vec![addr("10.0.0.2")]);
        assert_eq!(table.two_hop_neighbor(&addr("10.0.1.1")).unwrap().covered_count, 1);
    }

    #[test]
    fn test_optimize_never_drops_will_always() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::ALWAYS);
        sym(&mut table, "10.0.0.2", Willingness::ALWAYS);
        link(&mut table, "10.0.0.1", "10.0.1.1");
        link(&mut table, "10.0.0.2", "10.0.1.1");

        let mut mpr = selector(1);
        mpr.recompute_mpr_set(&mut table, &mut NoopNotifier);
        assert_eq!(mprs(&table), vec![addr("10.0.0.1"), addr("10.0.0.2")]);
    }

    #[test]
    fn test_change_detection_and_signal() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::DEFAULT);
        link(&mut table, "10.0.0.1", "10.0.1.1");

        let mut signals = Vec::new();
        let mut mpr = selector(1);

        // growing the set is not a change
        assert!(!mpr.recompute_mpr_set(&mut table, &mut |force: bool| signals.push(force)));
        assert_eq!(mpr.last_transition().added, vec![addr("10.0.0.1")]);

        // same set again
        assert!(!mpr.recompute_mpr_set(&mut table, &mut |force: bool| signals.push(force)));
        assert!(mpr.last_transition().is_empty());

        // relay loses its two-hop neighbor
        table.remove_two_hop_link(&addr("10.0.0.1"), &addr("10.0.1.1"));
        assert!(mpr.recompute_mpr_set(&mut table, &mut |force: bool| signals.push(force)));
        assert_eq!(mpr.last_transition().removed, vec![addr("10.0.0.1")]);
        assert_eq!(signals, vec![true]);

        // flags are reset after detection
        assert!(table.neighbors().all(|n| !n.was_mpr));
    }

    #[test]
    fn test_no_signal_without_tc_redundancy() {
        let mut table = NeighborTable::new();
        sym(&mut table, "10.0.0.1", Willingness::DEFAULT);
        link(&mut table, "10.0.0.1", "10.0.1.1");

        let mut mpr = MprSelector::new(MprConfig {
            mpr_coverage: 1,
            tc_redundancy: 0,
        });
        let mut signalled = false;
        mpr.recompute_mpr_set(&mut table, &mut |_: bool| signalled = true);
        table.remove_neighbor(&addr("10.0.0.1"));
        sym(&mut table, "10.0.0.2", Willingness::DEFAULT);

        // a removed neighbor takes its was_mpr flag with it
        assert!(!mpr.recompute_mpr_set(&mut table, &mut |_: bool| signalled = true));
        assert!(!signalled);

        table.add_two_hop_link(addr("10.0.0.2"), addr("10.0.1.1")).unwrap();
        mpr.recompute_mpr_set(&mut table, &mut |_: bool| signalled = true);
        table.set_status(&addr("10.0.0.2"), LinkStatus::NotSym).unwrap();
        assert!(mpr.recompute_mpr_set(&mut table, &mut |_: bool| signalled = true));
        assert!(!signalled);
    }

    #[test]
    fn test_empty_table() {
        let mut table = NeighborTable::new();
        let mut mpr = selector(1);
        assert!(!mpr.recompute_mpr_set(&mut table, &mut NoopNotifier));
        assert!(mprs(&table).is_empty());
    }
}
