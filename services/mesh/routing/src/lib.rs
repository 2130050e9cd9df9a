//! Multi-path routing information base, best-path selection and kernel route diffing for mesh.
//!
//! Every destination prefix in the RIB keeps one candidate path per
//! originator that advertised it. A recomputation pass stamps the candidates
//! that are still reachable with the current routing tree version, drops the
//! stale ones, picks a best path per prefix, and hands the result to a
//! kernel-sync collaborator as add/change/delete operations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod best_path;
pub mod calculate;
pub mod error;
pub mod kernel;
pub mod next_hop;
pub mod table;

pub use best_path::*;
pub use calculate::*;
pub use error::*;
pub use kernel::*;
pub use next_hop::*;
pub use table::*;
