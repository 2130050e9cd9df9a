//! Configuration handling for the OLSR node.
//!
//! Reads the node configuration and the neighborhood/topology scenario from
//! a YAML file, then applies environment variable overrides.

use anyhow::{Context, Result};
use mesh_neighbor::{LinkStatus, MprConfig, Willingness};
use mesh_routing::{FibMetric, RibConfig, RouteOrigin};
use mesh_topology::LinkCost;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};

/// Node configuration and scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// MPR selection parameters
    pub mpr: MprConfig,
    /// RIB parameters
    pub rib: RibConfig,
    /// One-hop neighbors
    pub neighbors: Vec<NeighborConfig>,
    /// Two-hop links learned from neighbor HELLOs
    pub two_hop_links: Vec<TwoHopLinkConfig>,
    /// Originators reached by the SPF run
    pub originators: Vec<OriginatorConfig>,
    /// Prefixes advertised by originators
    pub prefixes: Vec<PrefixConfig>,
}

/// One-hop neighbor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborConfig {
    /// Neighbor main address
    pub addr: IpAddr,
    /// Link symmetry
    #[serde(default = "default_status")]
    pub status: LinkStatus,
    /// Advertised willingness
    #[serde(default)]
    pub willingness: Willingness,
}

fn default_status() -> LinkStatus {
    LinkStatus::Sym
}

/// Link from a one-hop neighbor to a two-hop neighbor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoHopLinkConfig {
    /// One-hop neighbor
    pub neighbor: IpAddr,
    /// Two-hop neighbor reached through it
    pub two_hop: IpAddr,
}

/// SPF result for an originator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginatorConfig {
    /// Originator main address
    pub addr: IpAddr,
    /// Path cost
    pub cost: LinkCost,
    /// Hop count
    pub hops: u8,
    /// First-hop gateway
    pub gateway: IpAddr,
    /// Egress interface index
    #[serde(default)]
    pub if_index: u32,
}

/// Prefix advertised by an originator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Advertising originator
    pub originator: IpAddr,
    /// Prefix as `addr/len`; a bare address is a host route
    pub prefix: String,
    /// Advertisement kind
    #[serde(default = "default_origin")]
    pub origin: RouteOrigin,
}

fn default_origin() -> RouteOrigin {
    RouteOrigin::Hna
}

impl NodeConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<NodeConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}, using defaults: {}",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!("Config file {:?} not found, using defaults", config_path.as_ref());
        }

        config.apply_environment_overrides();

        info!(
            "Final node configuration: mpr_coverage={}, tc_redundancy={}, family={}, lq_nat_thresh={}, fib_metric={:?}, {} neighbors, {} originators, {} prefixes",
            config.mpr.mpr_coverage,
            config.mpr.tc_redundancy,
            config.rib.family,
            config.rib.lq_nat_thresh,
            config.rib.fib_metric,
            config.neighbors.len(),
            config.originators.len(),
            config.prefixes.len()
        );

        Ok(config)
    }

    /// Re-read the configuration file. Unlike [`NodeConfig::load_from_file`]
    /// a missing or unparseable file is an error.
    pub fn reload_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let mut config: NodeConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {:?}", path))?;

        config.apply_environment_overrides();
        Ok(config)
    }

    /// Replace this configuration with the file's current content. On a read
    /// or parse failure the current configuration is kept. Returns true if
    /// the file was loaded.
    pub fn refresh_from_file<P: AsRef<Path>>(&mut self, config_path: P) -> bool {
        match Self::reload_from_file(config_path) {
            Ok(config) => {
                *self = config;
                true
            }
            Err(e) => {
                warn!("Keeping previous configuration: {:#}", e);
                false
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("OLSR_MPR_COVERAGE") {
            if let Ok(coverage) = value.parse::<usize>() {
                self.mpr.mpr_coverage = coverage;
                info!("MPR coverage overridden by environment: {}", coverage);
            }
        }

        if let Some(value) = lookup("OLSR_TC_REDUNDANCY") {
            if let Ok(redundancy) = value.parse::<u8>() {
                self.mpr.tc_redundancy = redundancy;
                info!("TC redundancy overridden by environment: {}", redundancy);
            }
        }

        if let Some(value) = lookup("OLSR_LQ_NAT_THRESH") {
            if let Ok(thresh) = value.parse::<f32>() {
                self.rib.lq_nat_thresh = thresh;
                info!("NAT threshold overridden by environment: {}", thresh);
            }
        }

        if let Some(value) = lookup("OLSR_FIB_METRIC") {
            let mode = match value.to_lowercase().as_str() {
                "flat" => Some(FibMetric::Flat),
                "correct" => Some(FibMetric::Correct),
                "approx" => Some(FibMetric::Approx),
                _ => None,
            };
            match mode {
                Some(mode) => {
                    self.rib.fib_metric = mode;
                    info!("FIB metric overridden by environment: {:?}", mode);
                }
                None => warn!("Ignoring unknown OLSR_FIB_METRIC value {:?}", value),
            }
        }
    }
}
