//! Destination prefixes and address families.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Address family the node routes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4, host routes are /32
    #[default]
    Ipv4,
    /// IPv6, host routes are /128
    Ipv6,
}

impl AddressFamily {
    /// Family of an address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    /// Longest prefix length valid for this family
    pub fn max_prefix_len(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    /// The unspecified address of this family
    pub fn unspecified(self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "ipv4"),
            AddressFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// A destination prefix (address + prefix length).
///
/// Prefixes order by address bytes first, then by prefix length. Within one
/// family `IpAddr` compares its octets big-endian, so the derived ordering
/// is exactly the byte-wise comparison the routing tree is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Prefix {
    /// Network address
    pub addr: IpAddr,
    /// Prefix length in bits
    pub len: u8,
}

impl Prefix {
    /// Create a new prefix. The length is not validated here, the RIB
    /// rejects lengths beyond the configured family's maximum.
    pub fn new(addr: IpAddr, len: u8) -> Self {
        Self { addr, len }
    }

    /// Host route for an address (/32 or /128)
    pub fn host(addr: IpAddr) -> Self {
        let len = AddressFamily::of(&addr).max_prefix_len();
        Self { addr, len }
    }

    /// Default route of a family (0.0.0.0/0 or ::/0)
    pub fn default_route(family: AddressFamily) -> Self {
        Self {
            addr: family.unspecified(),
            len: 0,
        }
    }

    /// Whether this is a default route
    pub fn is_default(&self) -> bool {
        self.len == 0
    }

    /// Address family of the prefix
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    /// Whether the prefix length fits the address family
    pub fn is_valid(&self) -> bool {
        self.len <= self.family().max_prefix_len()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

/// Errors parsing a prefix from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixParseError {
    /// Address part is not an IP address
    #[error("invalid address in prefix: {0}")]
    Address(String),
    /// Length part is not a number
    #[error("invalid prefix length: {0}")]
    Length(String),
    /// Length exceeds the family's maximum
    #[error("prefix length {len} exceeds {max} for {addr}")]
    TooLong {
        /// Parsed address
        addr: IpAddr,
        /// Parsed length
        len: u8,
        /// Family maximum
        max: u8,
    },
}

impl FromStr for Prefix {
    type Err = PrefixParseError;

    /// Parses `addr/len`; a bare address is a host route.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, len_part) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };

        let addr: IpAddr = addr_part
            .trim()
            .parse()
            .map_err(|_| PrefixParseError::Address(addr_part.to_string()))?;

        let max = AddressFamily::of(&addr).max_prefix_len();
        let len = match len_part {
            Some(len) => len
                .trim()
                .parse::<u8>()
                .map_err(|_| PrefixParseError::Length(len.to_string()))?,
            None => max,
        };

        if len > max {
            return Err(PrefixParseError::TooLong { addr, len, max });
        }

        Ok(Self { addr, len })
    }
}
