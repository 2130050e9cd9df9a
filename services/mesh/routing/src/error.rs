//! RIB error types.

use mesh_topology::{AddressFamily, PathId, Prefix};
use thiserror::Error;

/// Errors returned by RIB operations.
///
/// None of these are fatal. A rejected advertisement is dropped and comes
/// back with the next periodic update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RibError {
    /// Prefix length beyond the family's maximum
    #[error("prefix {prefix} exceeds maximum prefix length {max}")]
    PrefixTooLong {
        /// Offending prefix
        prefix: Prefix,
        /// Configured maximum
        max: u8,
    },

    /// Prefix of the address family this node does not route
    #[error("prefix {prefix} is not {family}")]
    FamilyMismatch {
        /// Offending prefix
        prefix: Prefix,
        /// Configured family
        family: AddressFamily,
    },

    /// Candidate path handle no longer valid
    #[error("unknown candidate path {0}")]
    UnknownPath(PathId),

    /// Broken path cost handed to an update
    #[error("candidate path {0} updated with a broken cost")]
    UnreachableCost(PathId),
}
