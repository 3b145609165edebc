//! listcache - collect shopping lists from the command line.
//!
//! Reads come from the backend when it answers and from the local snapshot
//! when it does not; writes that cannot reach the backend are queued and
//! replayed by `listcache sync` or a running `listcache watch`.

mod output;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listcache_core::models::{CompletionInfo, ItemStatus, NewListItem};
use listcache_core::{
    AppContext, Config, ConnectivitySignal, SyncScheduler, SyncSettings, WriteOutcome,
};

// ============================================================================
// Constants
// ============================================================================

/// How often `watch` probes the backend for reachability
const PROBE_INTERVAL_SECS: u64 = 5;

/// Log file prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "listcache.log";

#[derive(Parser)]
#[command(name = "listcache")]
#[command(about = "Collect shopping lists - keeps working when the network does not")]
struct Cli {
    /// API base URL, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show all lists for this shop
    Lists,
    /// Show one list with its items
    Show { list_id: String },
    /// Set the status of an item: pending, collected or unavailable
    Mark {
        list_id: String,
        item_id: String,
        status: ItemStatus,
    },
    /// Register a list as completed
    Complete { list_id: String },
    /// Create a list; items as NAME or NAME:QTY
    Create {
        title: String,
        #[arg(long = "item")]
        items: Vec<NewListItem>,
    },
    /// Delete a list
    Delete { list_id: String },
    /// Replay queued updates now
    Sync,
    /// Show connectivity, cache age and queued updates
    Status,
    /// Print the effective configuration; --save writes it to the config file
    Config {
        #[arg(long)]
        save: bool,
    },
    /// Keep syncing in the background until Ctrl-C
    Watch {
        /// Seconds between sync passes (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=listcache_core=debug).
/// The returned guard must stay alive for file logs to be flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());
    debug!(api_url = %config.api_url, shop_id = %config.shop_id, "listcache starting");

    if let Command::Config { save } = cli.command {
        return show_config(&config, save);
    }

    let settings = sync_settings_for(&config, &cli.command);
    let ctx = AppContext::with_settings(config, settings)?;

    // Each invocation starts from what the network says right now
    if !ctx.api.probe().await {
        ctx.manager.connectivity_lost();
    }

    match cli.command {
        Command::Lists => lists(&ctx).await,
        Command::Show { list_id } => show(&ctx, &list_id).await,
        Command::Mark {
            list_id,
            item_id,
            status,
        } => {
            flush_queue(&ctx).await;
            let outcome = ctx.lists.update_item(&list_id, &item_id, status).await?;
            println!("{}", output::render_write(&format!("Item {} {}", item_id, status), &outcome));
            Ok(())
        }
        Command::Complete { list_id } => complete(&ctx, &list_id).await,
        Command::Create { title, items } => {
            flush_queue(&ctx).await;
            let outcome = ctx.lists.create_list(&title, &items).await?;
            println!("{}", output::render_write(&format!("List '{}' created", title.trim()), &outcome));
            Ok(())
        }
        Command::Delete { list_id } => {
            flush_queue(&ctx).await;
            let outcome = ctx.lists.delete_list(&list_id).await?;
            println!("{}", output::render_write(&format!("List {} deleted", list_id), &outcome));
            Ok(())
        }
        Command::Sync => {
            let outcome = ctx.manager.trigger_sync().await;
            println!("{}", output::render_drain(&outcome));
            Ok(())
        }
        Command::Status => {
            status(&ctx);
            Ok(())
        }
        Command::Watch { .. } => watch(ctx).await,
        Command::Config { .. } => Ok(()),
    }
}

/// Sync settings from the config, with `watch --interval` applied
fn sync_settings_for(config: &Config, command: &Command) -> SyncSettings {
    let mut settings = config.sync_settings();
    if let Command::Watch {
        interval: Some(secs),
    } = command
    {
        settings.sync_interval = Duration::from_secs((*secs).max(1));
    }
    settings
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        config.save().context("Failed to save configuration")?;
        println!("Saved to {}", Config::config_path()?.display());
    }
    Ok(())
}

/// Replay anything still queued before a new write, so writes reach the
/// backend in the order they were made
async fn flush_queue(ctx: &AppContext) {
    if ctx.manager.is_connected() && ctx.manager.pending_count() > 0 {
        let outcome = ctx.manager.drain_pending_queue().await;
        println!("{}", output::render_drain(&outcome));
    }
}

async fn lists(ctx: &AppContext) -> Result<()> {
    let outcome = ctx.lists.fetch_lists().await.context("No lists available")?;
    println!("Lists for {} ({})", ctx.lists.shop_id(), output::source_label(&outcome));
    println!("{}", output::render_lists(outcome.data()));
    Ok(())
}

async fn show(ctx: &AppContext, list_id: &str) -> Result<()> {
    let outcome = ctx
        .lists
        .fetch_list(list_id)
        .await
        .with_context(|| format!("List {} is not available", list_id))?;
    println!("{}", output::render_list(outcome.data()));
    println!("\n({})", output::source_label(&outcome));
    Ok(())
}

async fn complete(ctx: &AppContext, list_id: &str) -> Result<()> {
    flush_queue(ctx).await;
    let outcome = ctx.lists.complete_list(list_id).await?;
    println!("{}", output::render_write(&format!("List {} completed", list_id), &outcome));

    if let WriteOutcome::Applied(ref response) = outcome {
        match serde_json::from_value::<CompletionInfo>(response.clone()) {
            Ok(info) if info.queued => println!("Completion registered for list {}.", info.list_id),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Completion response without completion info"),
        }
    }
    Ok(())
}

fn status(ctx: &AppContext) {
    let manager = &ctx.manager;
    println!("API:        {}", ctx.config.api_url);
    println!(
        "Connection: {}",
        if manager.is_connected() { "online" } else { "offline" }
    );
    match manager.load_snapshot() {
        Some(snapshot) => println!(
            "Cache:      {} lists, updated {}",
            snapshot.records.len(),
            snapshot.age_display()
        ),
        None => println!("Cache:      empty"),
    }

    let pending = manager.pending_mutations();
    println!("Queued:     {}", pending.len());
    for mutation in &pending {
        println!(
            "  {} {}  (retries {}, queued {})",
            output::truncate_string(&mutation.id.simple().to_string(), 8),
            mutation.path,
            mutation.retry_count,
            mutation.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

/// Run the sync loop until Ctrl-C, turning reachability probes into
/// connectivity signals
async fn watch(ctx: AppContext) -> Result<()> {
    let connected = ctx.manager.is_connected();

    let scheduler = SyncScheduler::spawn(Arc::clone(&ctx.manager));
    println!(
        "Watching {} ({}), {} queued. Ctrl-C to stop.",
        ctx.config.api_url,
        if connected { "online" } else { "offline" },
        ctx.manager.pending_count()
    );

    // Catch up right away instead of waiting a full interval
    if connected {
        println!("{}", output::render_drain(&ctx.manager.trigger_sync().await));
    }

    let mut probe = tokio::time::interval(Duration::from_secs(PROBE_INTERVAL_SECS));
    let mut was_online = connected;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = probe.tick() => {
                let online = ctx.api.probe().await;
                if online != was_online {
                    was_online = online;
                    println!("{}", if online { "Back online - syncing." } else { "Connection lost - queueing updates." });
                    let signal = if online { ConnectivitySignal::Gained } else { ConnectivitySignal::Lost };
                    scheduler.signal(signal).await;
                }
            }
        }
    }

    info!("Stopping sync loop");
    scheduler.shutdown().await;
    println!("Stopped, {} update(s) still queued.", ctx.manager.pending_count());
    Ok(())
}
