//! WrapIndex CLI — index wrapped-token holder balances from an EVM chain.
//!
//! # Commands
//! ```text
//! wrapindex run     [--once] [--report-interval-secs <N>]
//! wrapindex report  [--json] [--page-size <N>]
//! wrapindex status  [--json]
//! wrapindex info
//! ```

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wrapindex_core::events::{BURN_SIGNATURE, TRANSFER_SIGNATURE};
use wrapindex_core::report::DEFAULT_PAGE_SIZE;
use wrapindex_core::{
    Address, BurnPolicy, CursorStore, EventDecoder, LedgerStore, ScannerConfig, SnapshotReporter,
};
use wrapindex_evm::{ChainScanner, HttpRpcClient};
use wrapindex_storage::StorageHandle;

mod cmd_report;
mod logging;

use cmd_report::Format;
use logging::LogConfig;

#[derive(Parser)]
#[command(
    name = "wrapindex",
    about = "Resumable holder-balance indexer for a wrapped token — WrapIndex CLI",
    long_about = "
WrapIndex scans Transfer and Burn logs of one token contract in fixed-size
block windows, keeps a signed balance per address, and prints paginated
holder snapshots. Progress is persisted after every window, so a restart
resumes where the last run stopped.

ENVIRONMENT VARIABLES:
  ETHEREUM_NODE_URL    JSON-RPC endpoint
  TOKEN_ADDRESS        Token contract to index
  STARTING_BLOCK       Cursor seeded on a fresh database
  DATABASE_URL         sqlite:<path> | postgres://… | memory
",
    version
)]
struct Cli {
    /// JSON-RPC endpoint of an Ethereum node
    #[arg(long, env = "ETHEREUM_NODE_URL", global = true)]
    rpc_url: Option<String>,

    /// Token contract address
    #[arg(long, env = "TOKEN_ADDRESS", global = true)]
    token: Option<String>,

    /// Cursor to seed on first run; scanning starts at the next block
    #[arg(long, env = "STARTING_BLOCK", global = true)]
    starting_block: Option<u64>,

    /// Store connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:wrapindex.db", global = true)]
    database_url: String,

    /// Blocks per eth_getLogs window
    #[arg(long, env = "WINDOW_WIDTH", default_value_t = 100, global = true)]
    window_width: u64,

    /// Wait between chain-height polls once caught up
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 15, global = true)]
    poll_interval_secs: u64,

    /// Wait before retrying a failed RPC call or store write
    #[arg(long, env = "RETRY_BACKOFF_SECS", default_value_t = 15, global = true)]
    retry_backoff_secs: u64,

    /// Give up after this many consecutive RPC retries (default: never)
    #[arg(long, env = "MAX_RPC_RETRIES", global = true)]
    max_rpc_retries: Option<u32>,

    /// Per-request HTTP timeout
    #[arg(long, default_value_t = 30, global = true)]
    rpc_timeout_secs: u64,

    /// What Burn events do to balances: ignore | subtract
    #[arg(long, env = "BURN_POLICY", default_value = "ignore", global = true)]
    burn_policy: BurnPolicy,

    /// Apply re-scanned events again instead of skipping them
    #[arg(long, global = true)]
    no_idempotence: bool,

    /// Default log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Per-crate log level, e.g. wrapindex-storage=debug (repeatable)
    #[arg(long = "log-component", global = true)]
    log_components: Vec<String>,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the chain and keep the ledger up to date
    Run {
        /// Stop once the cursor reaches the current chain height
        #[arg(long)]
        once: bool,
        /// Print a holder snapshot every N seconds (default: only at startup)
        #[arg(long)]
        report_interval_secs: Option<u64>,
        /// Skip the startup snapshot
        #[arg(long)]
        no_report: bool,
        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Print every holder, largest balance first
    Report {
        /// Rows fetched per query
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u64,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Show the persisted cursor and holder count
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Show WrapIndex build and capability info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log = LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
        ..Default::default()
    }
    .with_components(cli.log_components.iter().map(String::as_str));
    logging::init_tracing(&log);

    match &cli.command {
        Commands::Run {
            once,
            report_interval_secs,
            no_report,
            json,
        } => {
            let every = report_interval_secs.map(Duration::from_secs);
            let report = (!no_report).then_some((Format::from_json_flag(*json), every));
            cmd_run(&cli, *once, report).await
        }

        Commands::Report { page_size, json } => {
            let storage = open_storage(&cli.database_url).await?;
            let reporter = SnapshotReporter::new(storage.ledger).with_page_size(*page_size);
            cmd_report::print_snapshot(&reporter, Format::from_json_flag(*json)).await?;
            Ok(())
        }

        Commands::Status { json } => cmd_status(&cli.database_url, *json).await,

        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

// ─── Setup ───────────────────────────────────────────────────────────────────

fn scanner_config(cli: &Cli) -> Result<ScannerConfig> {
    let token = cli
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("token contract not set (--token or TOKEN_ADDRESS)"))?;
    let contract: Address = token
        .parse()
        .with_context(|| format!("invalid token address '{token}'"))?;

    let config = ScannerConfig {
        contract,
        starting_block: cli.starting_block,
        window_width: cli.window_width,
        poll_interval_ms: cli.poll_interval_secs.saturating_mul(1000),
        retry_backoff_ms: cli.retry_backoff_secs.saturating_mul(1000),
        max_rpc_retries: cli.max_rpc_retries,
        burn_policy: cli.burn_policy,
        idempotent: !cli.no_idempotence,
    };
    config.validate()?;
    Ok(config)
}

async fn open_storage(url: &str) -> Result<StorageHandle> {
    let storage = wrapindex_storage::connect(url)
        .await
        .with_context(|| format!("opening {} store", wrapindex_storage::BackendKind::from_url(url)))?;
    info!(backend = %storage.kind, "store opened");
    Ok(storage)
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn cmd_run(cli: &Cli, once: bool, report: Option<(Format, Option<Duration>)>) -> Result<()> {
    let config = scanner_config(cli)?;
    let rpc_url = cli
        .rpc_url
        .as_deref()
        .ok_or_else(|| anyhow!("RPC endpoint not set (--rpc-url or ETHEREUM_NODE_URL)"))?;
    let client = HttpRpcClient::new(rpc_url, Duration::from_secs(cli.rpc_timeout_secs))?;
    let storage = open_storage(&cli.database_url).await?;

    let mut scanner = ChainScanner::new(config, client, storage.cursor.clone(), storage.ledger.clone())?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested; finishing the current window");
                cancel.cancel();
            }
        });
    }

    if once {
        let cursor = scanner.run_until_caught_up(&cancel).await?;
        info!(cursor = ?cursor, stats = ?scanner.stats(), "caught up");
        if let Some((format, _)) = report {
            let reporter = SnapshotReporter::new(storage.ledger.clone());
            cmd_report::print_snapshot(&reporter, format).await?;
        }
        return Ok(());
    }

    let reporter_task = report.map(|(format, every)| {
        let reporter = SnapshotReporter::new(storage.ledger.clone());
        tokio::spawn(cmd_report::report_loop(reporter, format, every, cancel.clone()))
    });

    let result = scanner.run(cancel.clone()).await;
    cancel.cancel();

    if let Some(task) = reporter_task {
        if let Err(e) = task.await {
            warn!(error = %e, "report task ended abnormally");
        }
    }

    result.context("scanner stopped")?;
    info!(cursor = ?scanner.cursor(), "wrapindex stopped");
    Ok(())
}

#[derive(Serialize)]
struct Status {
    backend: String,
    cursor: Option<u64>,
    holders: u64,
}

async fn cmd_status(database_url: &str, as_json: bool) -> Result<()> {
    let storage = open_storage(database_url).await?;
    let status = Status {
        backend: storage.kind.to_string(),
        cursor: storage.cursor.cursor().await.context("reading cursor")?,
        holders: storage.ledger.holder_count().await.context("counting holders")?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Backend: {}", status.backend);
        match status.cursor {
            Some(block) => println!("Cursor:  {block}"),
            None => println!("Cursor:  (not seeded)"),
        }
        println!("Holders: {}", status.holders);
    }
    Ok(())
}

fn cmd_info() {
    let defaults = ScannerConfig::default();
    let [transfer, burn] = EventDecoder::new().topics();

    println!("WrapIndex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default window width: {} blocks", defaults.window_width);
    println!("  Default poll interval: {} ms", defaults.poll_interval_ms);
    println!("  Default retry backoff: {} ms", defaults.retry_backoff_ms);
    println!("  Default burn policy: {}", defaults.burn_policy);
    println!("  Snapshot page size: {DEFAULT_PAGE_SIZE} rows");
    println!("  Storage backends: memory, SQLite, PostgreSQL");
    println!("  Events:");
    println!("    {TRANSFER_SIGNATURE}  {transfer}");
    println!("    {BURN_SIGNATURE}  {burn}");
}
