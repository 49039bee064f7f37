//! scorewatch-cli: operator interface over the persisted score store.
//!
//! Works on the same RocksDB database the daemon writes. Inspection commands
//! open it read-only and run alongside a live daemon, seeing the data as of
//! the moment they start. Commands that change data need the write lock, so
//! the daemon must be stopped first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use scorewatch_core::constants::{MS_PER_HOUR, SUSPICIOUS_LOOKBACK_HOURS};
use scorewatch_core::traits::SystemClock;
use scorewatch_core::types::{ScoreReading, Timestamp, UserAlert};
use scorewatch_node_lib::notify::LogNotifier;
use scorewatch_node_lib::{RocksStore, Tracker, WatchConfig};

/// Scorewatch command-line interface.
#[derive(Parser)]
#[command(name = "scorewatch-cli")]
#[command(version, about = "Inspect and manage tracked scores and alerts")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (default: from config, else the platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a username.
    Track { username: String },
    /// Stop tracking a username and delete its history.
    Untrack { username: String },
    /// List tracked usernames with their latest score.
    Users,
    /// Show a user's score samples.
    History(HistoryArgs),
    /// Show the most recent alerts across all users.
    Alerts {
        /// Maximum number of alerts.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show graded suspicious alerts from the last N hours.
    Suspicious {
        /// Look-back window in hours.
        #[arg(long, default_value_t = SUSPICIOUS_LOOKBACK_HOURS)]
        hours: i64,
    },
    /// Show a user's activity summary for the last 24 hours.
    Stats { username: String },
    /// Record a score manually, as a sampler would.
    Record(RecordArgs),
    /// Remove history older than the retention window.
    Prune,
    /// Delete every user and all history.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Delete every alert, keeping score history.
    ClearAlerts,
    /// Write all data as JSON.
    Export {
        /// Output file, or a directory for a dated file name (default: stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

impl Commands {
    /// Whether the command changes stored data and needs the write lock.
    fn writes(&self) -> bool {
        matches!(
            self,
            Self::Track { .. }
                | Self::Untrack { .. }
                | Self::Record(_)
                | Self::Prune
                | Self::Clear { .. }
                | Self::ClearAlerts
        )
    }
}

#[derive(Args)]
struct HistoryArgs {
    username: String,

    /// Only samples from the last N days.
    #[arg(long)]
    days: Option<i64>,
}

#[derive(Args)]
struct RecordArgs {
    username: String,

    /// Score as displayed, e.g. "12,345".
    score: String,

    /// Mark the reading as corroborated by an independent page marker.
    #[arg(long)]
    corroborated: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let tracker = open_tracker(&cli.global, cli.command.writes())?;

    match cli.command {
        Commands::Track { username } => cmd_track(&tracker, &username),
        Commands::Untrack { username } => cmd_untrack(&tracker, &username),
        Commands::Users => cmd_users(&tracker),
        Commands::History(args) => cmd_history(&tracker, args),
        Commands::Alerts { limit } => {
            print_alerts(&tracker.recent_alerts(limit));
            Ok(())
        }
        Commands::Suspicious { hours } => cmd_suspicious(&tracker, hours),
        Commands::Stats { username } => cmd_stats(&tracker, &username),
        Commands::Record(args) => cmd_record(&tracker, args),
        Commands::Prune => cmd_prune(&tracker),
        Commands::Clear { yes } => cmd_clear(&tracker, yes),
        Commands::ClearAlerts => {
            let removed = tracker.clear_alerts().context("clearing alerts")?;
            println!("Removed {removed} alerts");
            Ok(())
        }
        Commands::Export { out } => cmd_export(&tracker, out),
    }
}

/// Load configuration and open the tracker over the on-disk store.
///
/// Read-only unless `writable`, so inspection does not contend with a
/// running daemon for the database lock.
fn open_tracker(global: &GlobalArgs, writable: bool) -> Result<Tracker> {
    let mut config =
        WatchConfig::load(global.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
    }
    // Configured users are the daemon's concern; the CLI only shows what is stored.
    config.tracked_users.clear();

    let db_path = config.db_path();
    let store = if writable {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create directory: {}", config.data_dir.display())
        })?;
        RocksStore::open(&db_path).with_context(|| {
            format!(
                "Failed to open database: {} (stop scorewatch-node before changing data)",
                db_path.display()
            )
        })?
    } else {
        if !db_path.exists() {
            bail!("No database at {}", db_path.display());
        }
        RocksStore::open_read_only(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?
    };

    Tracker::from_config(
        &config,
        Box::new(store),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
    )
    .context("Failed to load score history")
}

fn cmd_track(tracker: &Tracker, username: &str) -> Result<()> {
    if tracker.track(username)? {
        println!("Now tracking {}", username.trim());
    } else {
        println!("Already tracking {}", username.trim());
    }
    Ok(())
}

fn cmd_untrack(tracker: &Tracker, username: &str) -> Result<()> {
    if tracker.remove_user(username)? {
        println!("Stopped tracking {}", username.trim());
    } else {
        println!("Not tracked: {}", username.trim());
    }
    Ok(())
}

fn cmd_users(tracker: &Tracker) -> Result<()> {
    let names = tracker.usernames();
    if names.is_empty() {
        println!("No tracked users");
        return Ok(());
    }
    for name in names {
        match tracker.with_store(|s| s.latest_sample(&name).copied()) {
            Some(sample) => println!(
                "{name:<24} {:>12}  (updated {})",
                sample.score, sample.timestamp
            ),
            None => println!("{name:<24} {:>12}", "-"),
        }
    }
    if let Some(at) = tracker.last_prune()? {
        println!("\nLast prune: {at}");
    }
    Ok(())
}

fn cmd_history(tracker: &Tracker, args: HistoryArgs) -> Result<()> {
    let Some(record) = tracker.user(&args.username) else {
        bail!("Not tracked: {}", args.username.trim());
    };
    let since = match args.days {
        Some(days) if days < 0 => bail!("--days must not be negative"),
        Some(days) => {
            let window = Duration::from_secs((days as u64).saturating_mul(24 * 60 * 60));
            tracker.now().saturating_sub(window)
        }
        None => Timestamp::EPOCH,
    };

    println!("Tracking since {}", record.added_at);
    let mut previous: Option<u64> = None;
    for sample in record.scores.iter() {
        let change = previous
            .map(|p| format!("{:+}", i128::from(sample.score) - i128::from(p)))
            .unwrap_or_default();
        previous = Some(sample.score);
        if sample.timestamp < since {
            continue;
        }
        let marker = if sample.corroborated { "corroborated" } else { "" };
        println!(
            "{}  {:>12} {:>8}  {marker}",
            sample.timestamp, sample.score, change
        );
    }
    Ok(())
}

fn cmd_suspicious(tracker: &Tracker, hours: i64) -> Result<()> {
    if hours < 0 {
        bail!("--hours must not be negative");
    }
    let since = Timestamp::from_millis(
        tracker
            .now()
            .as_millis()
            .saturating_sub(hours.saturating_mul(MS_PER_HOUR)),
    );
    let activity = tracker.with_store(|s| s.suspicious_activity(since));
    if activity.is_empty() {
        println!("No suspicious activity in the last {hours} hours");
        return Ok(());
    }
    for entry in &activity {
        println!(
            "{}  {:<6} {:<16} {:+}  {}",
            entry.alert.timestamp,
            entry.level.as_str().to_uppercase(),
            entry.username,
            entry.alert.delta,
            entry.alert.message
        );
    }
    Ok(())
}

fn cmd_stats(tracker: &Tracker, username: &str) -> Result<()> {
    let now = tracker.now();
    let Some(stats) = tracker.with_store(|s| s.user_stats(username, now)) else {
        bail!("No samples for {}", username.trim());
    };

    println!("User:              {}", stats.username);
    println!("Current score:     {}", stats.current_score);
    println!("Last updated:      {}", stats.last_updated);
    println!("Corroborated:      {}", stats.corroborated_latest);
    println!("Changes (24h):     {}", stats.changes_today);
    println!("Total change (24h): {:+}", stats.total_change_today);
    println!("Daily change:      {:+}", stats.daily_change);
    println!("Samples stored:    {}", stats.samples);
    println!(
        "Alerts stored:     {} suspicious, {} normal",
        stats.suspicious_alerts, stats.normal_alerts
    );
    Ok(())
}

fn cmd_record(tracker: &Tracker, args: RecordArgs) -> Result<()> {
    let reading = ScoreReading::from_text(&args.username, &args.score, args.corroborated)
        .with_context(|| format!("Invalid score: {}", args.score))?;
    match tracker.record(&reading)? {
        Some(alert) => println!("{}: {}", alert.kind.title(), alert.message),
        None => println!("Recorded {} for {}", reading.score, reading.username.trim()),
    }
    Ok(())
}

fn cmd_prune(tracker: &Tracker) -> Result<()> {
    let report = tracker.prune().context("pruning history")?;
    println!(
        "Removed {} samples and {} alerts",
        report.samples_removed, report.alerts_removed
    );
    Ok(())
}

fn cmd_clear(tracker: &Tracker, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete all data without --yes");
    }
    let users = tracker.usernames().len();
    tracker.clear().context("clearing data")?;
    println!("Deleted {users} users");
    Ok(())
}

fn cmd_export(tracker: &Tracker, out: Option<PathBuf>) -> Result<()> {
    let now = tracker.now();
    let doc = tracker.with_store(|s| s.export(now));
    let json = serde_json::to_string_pretty(&doc).context("serializing export")?;

    match out {
        Some(out) => {
            let path = export_path(out, now);
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} users to {}", doc.users.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// `out` itself, or a dated file inside it when `out` is a directory.
fn export_path(out: PathBuf, now: Timestamp) -> PathBuf {
    if out.is_dir() {
        out.join(export_file_name(now))
    } else {
        out
    }
}

/// Conventional export file name for a given time, e.g. `scorewatch-2024-05-01.json`.
fn export_file_name(now: Timestamp) -> String {
    match now.to_datetime() {
        Some(dt) => format!("scorewatch-{}.json", dt.format("%Y-%m-%d")),
        None => "scorewatch.json".to_string(),
    }
}

fn print_alerts(alerts: &[UserAlert]) {
    if alerts.is_empty() {
        println!("No alerts");
        return;
    }
    for ua in alerts {
        println!(
            "{}  {:<10} {:<16} {:+}  {}",
            ua.alert.timestamp,
            ua.alert.kind.as_str(),
            ua.username,
            ua.alert.delta,
            ua.alert.message
        );
    }
}
