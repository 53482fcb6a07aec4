//! ChainRegistry CLI: resolve Farcaster fids, fnames and addresses against a
//! live Ethereum node.
//!
//! # Commands
//! ```text
//! chainregistry info
//! chainregistry resolve --url <rpc> --fid <n>
//! chainregistry resolve --url <rpc> --fname <name>
//! chainregistry resolve --url <rpc> --address <0x..>
//! chainregistry watch   --url <rpc>
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chainregistry_core::{RegistryConfig, RegistryQuery};
use chainregistry_evm::{Registry, RegistryBuilder};
use chainregistry_rpc::{HttpTransport, RpcLogSource};

#[derive(Parser)]
#[command(
    name = "chainregistry",
    about = "ChainRegistry CLI: Farcaster identity registry indexer",
    long_about = "
ChainRegistry CLI: sync the Farcaster IdRegistry and NameRegistry event logs
from an Ethereum node and resolve fids, fnames and owner addresses.

ENVIRONMENT VARIABLES:
  CHAINREGISTRY_RPC_URL   Ethereum mainnet JSON-RPC URL
  RUST_LOG                Log filter (default: info)
",
    version
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default registry configuration
    Info,

    /// Sync once, then resolve a single fid, fname or address
    Resolve {
        #[command(flatten)]
        sync: SyncArgs,
        /// Look up by fid
        #[arg(long, group = "key")]
        fid: Option<u64>,
        /// Look up by fname
        #[arg(long, group = "key")]
        fname: Option<String>,
        /// Look up by owner address
        #[arg(long, group = "key")]
        address: Option<String>,
    },

    /// Sync, then keep refreshing until Ctrl-C
    Watch {
        #[command(flatten)]
        sync: SyncArgs,
    },
}

#[derive(Args)]
struct SyncArgs {
    /// JSON-RPC endpoint URL
    #[arg(long, env = "CHAINREGISTRY_RPC_URL")]
    url: String,
    /// Blocks per eth_getLogs window
    #[arg(long, default_value_t = 2_000)]
    window_size: u64,
    /// Delay between windows, in milliseconds
    #[arg(long, default_value_t = 100)]
    window_delay_ms: u64,
    /// Blocks behind head to stop at
    #[arg(long, default_value_t = 0)]
    confirmation_depth: u64,
    /// Refresh interval for `watch`, in milliseconds
    #[arg(long, default_value_t = 60_000)]
    refresh_interval_ms: u64,
    /// Per-request HTTP timeout, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Info => cmd_info(),
        Commands::Resolve { sync, fid, fname, address } => {
            cmd_resolve(&sync, fid, fname.as_deref(), address.as_deref()).await
        }
        Commands::Watch { sync } => cmd_watch(&sync).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

fn cmd_info() -> Result<()> {
    let config = RegistryConfig::default();
    println!("chainregistry {}", env!("CARGO_PKG_VERSION"));
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn connect(args: &SyncArgs) -> Result<Registry> {
    let transport = HttpTransport::new(&args.url, Duration::from_secs(args.timeout_secs))
        .context("failed to create HTTP transport")?;
    let source = Arc::new(RpcLogSource::new(transport));

    RegistryBuilder::new()
        .window_size(args.window_size)
        .window_delay_ms(args.window_delay_ms)
        .confirmation_depth(args.confirmation_depth)
        .refresh_interval_ms(args.refresh_interval_ms)
        .connect(source)
        .await
        .with_context(|| format!("initial sync against {} failed", args.url))
}

async fn cmd_resolve(
    args: &SyncArgs,
    fid: Option<u64>,
    fname: Option<&str>,
    address: Option<&str>,
) -> Result<()> {
    let registry = connect(args).await?;

    let out = match (fid, fname, address) {
        (Some(fid), _, _) => json!({
            "fid": fid,
            "address": registry.address_by_fid(fid).ok(),
            "fname": registry.fname_by_fid(fid).ok(),
        }),
        (_, Some(fname), _) => json!({
            "fname": fname,
            "address": registry.address_by_fname(fname).ok(),
            "fid": registry.fid_by_fname(fname).ok(),
        }),
        (_, _, Some(address)) => json!({
            "address": address,
            "fid": registry.fid_by_address(address).ok(),
            "fname": registry.fname_by_address(address).ok(),
        }),
        (None, None, None) => serde_json::to_value(registry.stats())?,
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn cmd_watch(args: &SyncArgs) -> Result<()> {
    let registry = connect(args).await?;
    let refresh = registry.spawn_refresh();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    registry.shutdown();
    refresh.await.context("refresh task panicked")?;
    println!("{}", serde_json::to_string_pretty(&registry.stats())?);
    Ok(())
}
