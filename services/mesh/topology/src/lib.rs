//! Destination prefixes, link costs and the per-originator topology set for mesh.
//!
//! This crate holds the data the SPF run leaves behind for every originator
//! (path cost, hop count and the first-hop link) together with the prefix
//! index each originator anchors its candidate routes in. The routing crate
//! reads these entries on every recomputation pass.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod link_state;
pub mod prefix;

pub use link_state::*;
pub use prefix::*;
