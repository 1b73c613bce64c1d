//! `driftd`: the Drift daemon.
//!
//! Command-line front end over the placement and rebalancing core.
//!
//! # Usage
//!
//! ```text
//! driftd ids --address 127.0.0.1 --port 8080     # node id of an address
//! driftd place user/42 -m 10.0.0.1:7070 -m 10.0.0.2:7070
//! driftd place user/42 --strategy rendezvous     # members from config
//! driftd simulate -n 3 -k 1000 --add 1           # grow a group in-process
//! driftd -c drift.toml simulate                  # with a config file
//! ```

mod config;
mod simulate;
mod telemetry;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drift_placement::Placement;
use drift_types::{
    MembershipView, NodeDescriptor, PlacementStrategy, StoreBackendKind, placement_key,
};
use tracing::debug;

use config::CliConfig;
use simulate::SimulationOptions;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "driftd",
    version,
    about = "Drift sharded key-value placement and rebalancing"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true, env = "DRIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node id and short id of an address.
    Ids {
        /// Host name or IP address. Defaults to `[node] address`.
        #[arg(short, long)]
        address: Option<String>,

        /// Port. Defaults to `[node] port`.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show which member owns a key.
    Place {
        /// The key to place.
        key: String,

        /// Placement strategy. Defaults to `[group] placement`.
        #[arg(short, long)]
        strategy: Option<PlacementStrategy>,

        /// Group member as `host:port`. Can be given multiple times;
        /// defaults to `[group] members`.
        #[arg(short, long = "member")]
        members: Vec<NodeDescriptor>,
    },

    /// Grow an in-process group and report what moved.
    Simulate {
        /// Members before the change.
        #[arg(short = 'n', long, default_value = "3")]
        nodes: usize,

        /// Objects written before the change.
        #[arg(short = 'k', long, default_value = "1000")]
        objects: usize,

        /// Members joining.
        #[arg(short, long, default_value = "1")]
        add: usize,

        /// Placement strategy. Defaults to `[group] placement`.
        #[arg(short, long)]
        strategy: Option<PlacementStrategy>,

        /// Store objects in files under a scratch directory in the data
        /// directory.
        #[arg(long)]
        file: bool,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    telemetry::init(&config.log.level);

    match cli.command {
        Commands::Ids { address, port } => {
            if let Some(address) = address {
                config.node.address = address;
            }
            if let Some(port) = port {
                config.node.port = port;
            }
            cmd_ids(&config.local_node());
            Ok(())
        }
        Commands::Place {
            key,
            strategy,
            members,
        } => {
            if let Some(strategy) = strategy {
                config.group.placement = strategy;
            }
            let view = if members.is_empty() {
                config.membership()?
            } else {
                MembershipView::new(members)
            };
            cmd_place(&key, config.group.placement, &view)
        }
        Commands::Simulate {
            nodes,
            objects,
            add,
            strategy,
            file,
        } => {
            // CLI args override config file values.
            if let Some(strategy) = strategy {
                config.group.placement = strategy;
            }
            if file {
                config.storage.backend = StoreBackendKind::File;
            }
            let options = SimulationOptions {
                nodes,
                objects,
                add,
            };
            cmd_simulate(&config, &options).await
        }
    }
}

// -----------------------------------------------------------------------
// driftd ids
// -----------------------------------------------------------------------

fn cmd_ids(node: &NodeDescriptor) {
    println!("Node:     {node}");
    println!("Node ID:  {}", node.node_id());
    println!("Short ID: {}", node.short_id());
}

// -----------------------------------------------------------------------
// driftd place
// -----------------------------------------------------------------------

fn cmd_place(key: &str, strategy: PlacementStrategy, view: &MembershipView) -> Result<()> {
    let key_id = placement_key(key);
    let owner_id = strategy
        .place(&key_id, &view.node_ids())
        .with_context(|| format!("failed to place {key:?}"))?;
    let owner = view
        .descriptor(&owner_id)
        .context("owner is not part of the view")?;
    debug!(%key, %strategy, members = view.len(), "placed key");

    println!("Key:      {key}");
    println!("Key ID:   {key_id}");
    println!("Strategy: {strategy}");
    println!("Owner:    {owner} ({})", owner_id.short());
    Ok(())
}

// -----------------------------------------------------------------------
// driftd simulate
// -----------------------------------------------------------------------

async fn cmd_simulate(config: &CliConfig, options: &SimulationOptions) -> Result<()> {
    println!("Drift Simulation");
    println!("  nodes:     {} (+{})", options.nodes, options.add);
    println!("  objects:   {}", options.objects);
    println!("  placement: {}", config.group.placement);
    println!("  backend:   {:?}", config.storage.backend);
    println!();

    let start = Instant::now();
    let summary = simulate::run(config, options).await?;
    let elapsed = start.elapsed();

    for (node, report) in &summary.reports {
        println!(
            "  {node:<21} migrated {:>6}  skipped {:>6}  failed {:>4}",
            report.migrated.len(),
            report.skipped,
            report.not_migrated.len()
        );
    }
    println!();

    let moved = summary.migrated();
    let fraction = if summary.objects == 0 {
        0.0
    } else {
        moved as f64 / summary.objects as f64
    };
    println!("Summary:");
    println!("  Moved:      {moved} of {} ({:.1}%)", summary.objects, fraction * 100.0);
    println!("  Not moved:  {}", summary.not_migrated());
    println!("  Lost:       {}", summary.lost.len());
    println!("  Duplicated: {}", summary.duplicated.len());
    println!("  Misplaced:  {}", summary.misplaced.len());
    println!("  Elapsed:    {:.2}s", elapsed.as_secs_f64());

    anyhow::ensure!(
        summary.is_clean(),
        "simulation ended with {} objects",
        summary.problems()
    );
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
