//! Best-path comparator

use crate::table::RtPath;
use mesh_topology::{LinkCost, PathId};
use std::cmp::Ordering;

/// Cost of a path as ranked by best-path selection. The current internet
/// gateway's cost is scaled by `lq_nat_thresh` and truncated, so a
/// challenger has to be clearly better before the default route moves.
fn effective_cost(path: &RtPath, gateway: Option<PathId>, lq_nat_thresh: f32) -> LinkCost {
    if gateway == Some(path.id) {
        (f64::from(path.metric.cost) * f64::from(lq_nat_thresh)) as LinkCost
    } else {
        path.metric.cost
    }
}

/// Total order over candidate paths: cost ascending, then hop count
/// ascending, then originator address ascending.
pub fn compare_paths(
    a: &RtPath,
    b: &RtPath,
    gateway: Option<PathId>,
    lq_nat_thresh: f32,
) -> Ordering {
    effective_cost(a, gateway, lq_nat_thresh)
        .cmp(&effective_cost(b, gateway, lq_nat_thresh))
        .then_with(|| a.metric.hops.cmp(&b.metric.hops))
        .then_with(|| a.originator.cmp(&b.originator))
}

/// Whether `a` ranks strictly before `b`, without a gateway penalty
pub fn is_better(a: &RtPath, b: &RtPath) -> bool {
    compare_paths(a, b, None, 1.0) == Ordering::Less
}
