//! One-hop/two-hop neighbor graph and multipoint relay (MPR) selection for mesh.
//!
//! The neighbor table is filled by link and neighbor discovery. On every
//! recomputation the [`MprSelector`] walks the table, flags the relays that
//! cover the two-hop neighborhood, and reports whether the relay set changed
//! so topology advertisements can be forced out early.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mpr;
pub mod table;

pub use mpr::*;
pub use table::*;
