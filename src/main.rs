// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zonesync::{
    config::Config,
    constants::{DEFAULT_CONFIG_PATH, DEFAULT_ZONE_ID},
    metrics,
    names::dot_terminate,
    provider::{Discovery, MemoryZone, TopologyFile},
    records::Action,
    resolve::{parse_nameserver, Resolver, TcpTransport},
    snapshot::Snapshot,
    sync::{desired_tree, SyncEngine},
};

/// Derive DNS records from fleet topology and reconcile them against a zone.
#[derive(Parser, Debug)]
#[command(name = "zonesync", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root domain, overriding the configuration file
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Zone file arguments shared by `plan` and `sync`.
#[derive(clap::Args, Debug)]
struct ZoneArgs {
    /// Topology file listing instances and load balancers
    #[arg(long)]
    topology: PathBuf,

    /// Zone snapshot file; a missing file is an empty zone at the root
    #[arg(long)]
    zone: PathBuf,

    /// Hosted zone id
    #[arg(long, default_value = DEFAULT_ZONE_ID)]
    zone_id: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the changes a sync would make
    Plan {
        #[command(flatten)]
        zone: ZoneArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the zone with the topology
    Sync {
        #[command(flatten)]
        zone: ZoneArgs,

        /// Log the chunks without applying them
        #[arg(long)]
        dry_run: bool,

        /// Write Prometheus metrics to this file when done
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },
    /// Write the desired record tree as a snapshot
    Snapshot {
        /// Topology file listing instances and load balancers
        #[arg(long)]
        topology: PathBuf,

        /// Output snapshot file
        #[arg(long)]
        output: PathBuf,
    },
    /// Resolve a published name
    Resolve {
        /// Name to resolve
        name: String,

        /// Follow indirection markers
        #[arg(long, short)]
        recursive: bool,

        /// Print whole answer records instead of payloads
        #[arg(long)]
        full: bool,

        /// Nameserver as host or host:port, overriding the configuration
        #[arg(long)]
        nameserver: Option<String>,

        /// Return partial answers on timeouts
        #[arg(long)]
        best_effort: bool,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("zonesync-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_tracing() {
    // Respects RUST_LOG (default info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "zonesync", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();
    let config = load_config(cli.config.as_deref(), cli.root.as_deref()).await?;
    debug!(root = %config.root, "configuration ready");

    match cli.command {
        Command::Plan { zone, json } => run_plan(&config, &zone, json).await,
        Command::Sync {
            zone,
            dry_run,
            metrics_file,
        } => run_sync(&config, &zone, dry_run, metrics_file.as_deref()).await,
        Command::Snapshot { topology, output } => run_snapshot(&config, &topology, &output).await,
        Command::Resolve {
            name,
            recursive,
            full,
            nameserver,
            best_effort,
        } => run_resolve(&config, name, recursive, full, nameserver, best_effort).await,
        Command::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Setup helpers
// ============================================================================

/// Load the configuration: an explicit path must exist, the default path is
/// optional. A `root` argument replaces the configured root.
async fn load_config(path: Option<&Path>, root: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path).await?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if tokio::fs::try_exists(default).await.unwrap_or(false) {
                Config::load(default).await?
            } else {
                debug!(path = DEFAULT_CONFIG_PATH, "no configuration file, using defaults");
                Config::default()
            }
        }
    };
    if let Some(root) = root {
        config.root = root.to_string();
    }
    Ok(config)
}

fn require_root(config: &Config) -> Result<()> {
    if config.root.trim().is_empty() {
        bail!("No root domain configured; set `root` in the configuration or pass --root");
    }
    Ok(())
}

async fn open_zone(args: &ZoneArgs, config: &Config) -> Result<MemoryZone> {
    if tokio::fs::try_exists(&args.zone).await.unwrap_or(false) {
        MemoryZone::load(args.zone_id.clone(), &args.zone).await
    } else {
        info!(
            path = %args.zone.display(),
            root = %config.root,
            "zone file not found, starting empty"
        );
        Ok(MemoryZone::new(args.zone_id.clone(), &config.root))
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_plan(config: &Config, args: &ZoneArgs, json: bool) -> Result<()> {
    require_root(config)?;
    let discovery = TopologyFile::load(&args.topology).await?;
    let zone = open_zone(args, config).await?;

    let plan = SyncEngine::new(&discovery, &zone, &zone, config).plan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for change in &plan.changes {
            println!("{change}");
        }
        println!(
            "{} create, {} delete (plan {})",
            plan.count(Action::Create),
            plan.count(Action::Delete),
            plan.fingerprint
        );
    }
    Ok(())
}

async fn run_sync(
    config: &Config,
    args: &ZoneArgs,
    dry_run: bool,
    metrics_file: Option<&Path>,
) -> Result<()> {
    require_root(config)?;
    let discovery = TopologyFile::load(&args.topology).await?;
    let zone = open_zone(args, config).await?;

    let (plan, report) = SyncEngine::new(&discovery, &zone, &zone, config)
        .sync(dry_run)
        .await?;

    if !dry_run && report.applied > 0 {
        zone.save(&args.zone)
            .await
            .with_context(|| format!("Failed to write zone file {}", args.zone.display()))?;
    }

    if let Some(path) = metrics_file {
        tokio::fs::write(path, metrics::gather_metrics()?)
            .await
            .with_context(|| format!("Failed to write metrics file {}", path.display()))?;
    }

    for failure in &report.failures {
        warn!(error = %failure, "change not applied");
    }
    if !report.is_success() {
        bail!(
            "{} of {} changes failed to apply",
            plan.changes.len() - report.applied,
            plan.changes.len()
        );
    }
    Ok(())
}

async fn run_snapshot(config: &Config, topology: &Path, output: &Path) -> Result<()> {
    require_root(config)?;
    let discovery = TopologyFile::load(topology).await?;
    let instances = discovery.instances().await?;
    let load_balancers = discovery.load_balancers().await?;

    let desired = desired_tree(&instances, &load_balancers, config);
    Snapshot::new(config.root.clone(), &desired).save(output).await?;
    info!(path = %output.display(), names = desired.len(), "wrote snapshot");
    Ok(())
}

async fn run_resolve(
    config: &Config,
    name: String,
    recursive: bool,
    full: bool,
    nameserver: Option<String>,
    best_effort: bool,
) -> Result<()> {
    let mut settings = config.resolver.clone();
    if let Some(nameserver) = nameserver {
        parse_nameserver(&nameserver)?;
        settings.nameserver = Some(nameserver);
    }
    settings.best_effort |= best_effort;

    let transport = TcpTransport::from_config(&settings)?;
    let resolver = Resolver::new(transport, settings.max_hops, settings.best_effort);
    let name = dot_terminate(&name);

    let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&name, recursive, full))
        .await
        .context("Resolver task panicked")??;

    for answer in resolved {
        println!("{answer}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
