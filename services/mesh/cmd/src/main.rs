//! OLSR route computation node.
//!
//! Loads the neighborhood and topology scenario from a YAML file and, on
//! every tick, recomputes the MPR set and the routing table and pushes the
//! resulting route changes to the kernel writer.

use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;
mod node;

use config::NodeConfig;
use logging::OlsrLogFormatter;
use node::{LoggingKernelSync, Node};

/// OLSR MPR selection and routing table maintenance
#[derive(Parser, Debug)]
#[command(name = "olsr-mesh", version, about = "OLSR MPR selection and RIB maintenance")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "olsr.yaml")]
    config: PathBuf,

    /// Recomputation interval, e.g. 5s
    #[arg(long, default_value = "5s")]
    interval: humantime::Duration,

    /// Stop after this many passes
    #[arg(long)]
    passes: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print each pass outcome as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("olsr_mesh={}", args.log_level).parse()?)
            .add_directive(format!("mesh_neighbor={}", args.log_level).parse()?)
            .add_directive(format!("mesh_routing={}", args.log_level).parse()?)
            .add_directive(format!("mesh_topology={}", args.log_level).parse()?),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .event_format(OlsrLogFormatter::new("olsr"))
        .init();

    info!("Starting OLSR mesh node v{}", env!("CARGO_PKG_VERSION"));

    let mut config = NodeConfig::load_from_file(&args.config)
        .with_context(|| format!("loading configuration from {:?}", args.config))?;
    let mut node = Node::new(&config, LoggingKernelSync);

    let interval = Duration::from(args.interval);
    if interval.is_zero() {
        anyhow::bail!("--interval must be greater than zero");
    }
    let mut ticker = tokio::time::interval(interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // the first tick completes immediately
                if node.passes() > 0 {
                    config.refresh_from_file(&args.config);
                }
                node.apply(&config);

                let outcome = node.run_pass();
                if outcome.force_tc {
                    component_warn!("mpr", "Relay set shrank, topology advertisement requested");
                }
                info!(
                    component = "node",
                    version = outcome.rib.version,
                    mprs = outcome.mprs.len(),
                    routes = outcome.routes.len(),
                    "Pass complete"
                );

                if args.json {
                    let json = serde_json::to_string(&outcome).context("serializing pass outcome")?;
                    println!("{}", json);
                }

                if args.passes.is_some_and(|limit| node.passes() >= limit) {
                    info!("Completed {} passes", node.passes());
                    break;
                }
            }

            result = &mut shutdown => {
                result.context("waiting for ctrl-c")?;
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    info!("OLSR mesh node stopped after {} passes", node.passes());
    Ok(())
}
