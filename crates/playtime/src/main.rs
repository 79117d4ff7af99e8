//! playtime - daily screen-time budget tracker
//!
//! Terminal front-end wiring together:
//! - Configuration loading
//! - The CSV session log
//! - The SNTP-corrected time source
//! - The session tracker

mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use playtime_clock::{SntpAuthority, TimeSource};
use playtime_config::{Policy, load_config_or_default};
use playtime_core::{SessionTracker, TrackerEvent};
use playtime_store::CsvLedger;
use playtime_util::{
    default_config_path, default_ledger_path, format_clock_time, format_duration,
    is_mock_time_active,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Number of attempts to persist a session before giving up
const STOP_ATTEMPTS: u32 = 3;

/// playtime - Track play sessions against a daily screen-time budget
#[derive(Parser, Debug)]
#[command(name = "playtime", version)]
#[command(about = "Track play sessions against a daily screen-time budget", long_about = None)]
struct Args {
    /// Configuration file path (or set PLAYTIME_CONFIG env var)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Session log override (default: from config, then the data directory)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's usage against the limit
    Status {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a session and track it until Enter or Ctrl-C
    Play {
        /// Activity label (default: the first configured activity)
        #[arg(short, long)]
        activity: Option<String>,
    },

    /// List recent sessions, newest first
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Query the time server and show the correction
    Sync,
}

fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn ledger_path(args: &Args, policy: &Policy) -> PathBuf {
    args.ledger
        .clone()
        .or_else(|| policy.ledger_path.clone())
        .unwrap_or_else(default_ledger_path)
}

fn build_tracker(args: &Args) -> Result<SessionTracker> {
    let policy = load_config_or_default(&args.config);
    info!(
        config_path = %args.config.display(),
        weekday_limit = policy.weekday_limit_minutes,
        weekend_limit = policy.weekend_limit_minutes,
        "Configuration loaded"
    );

    let ledger_path = ledger_path(args, &policy);
    let ledger = Arc::new(CsvLedger::new(&ledger_path));

    let authority = Arc::new(SntpAuthority::new(
        policy.time_sync.server.clone(),
        policy.time_sync.timeout,
    ));
    let time = Arc::new(TimeSource::system(authority));

    SessionTracker::open(policy, ledger, time)
        .with_context(|| format!("Failed to open session log {}", ledger_path.display()))
}

fn print_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::TimeSyncFailed { reason, .. } => {
            println!("Could not reach the time server ({}); using the local clock", reason);
        }
        TrackerEvent::LimitReached { limit_minutes, .. } => {
            println!();
            println!("Time's up: today's {} minutes are used.", limit_minutes);
        }
        TrackerEvent::ClockAnomaly { .. } => {
            println!("The clock went backwards during this session; recorded 0 minutes.");
        }
        TrackerEvent::RecordSkipped { line, reason } => {
            println!("Ignoring line {} of the session log: {}", line, reason);
        }
        TrackerEvent::SessionStarted { .. }
        | TrackerEvent::TimeResynced { .. }
        | TrackerEvent::SessionStopped { .. } => {}
    }
}

fn status(tracker: &SessionTracker, json: bool) -> Result<()> {
    let summary = tracker.summary()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render::summary_block(&summary));
    }
    Ok(())
}

fn history(tracker: &SessionTracker, limit: usize) -> Result<()> {
    let records = tracker.recent_sessions(limit)?;
    if records.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }
    for record in &records {
        println!("{}", render::history_row(record));
    }
    Ok(())
}

async fn sync(tracker: &SessionTracker) -> Result<()> {
    let time = tracker.time_source();
    match tracker.resync().await {
        TrackerEvent::TimeResynced { offset } => {
            let magnitude = offset.abs().to_std().unwrap_or_default();
            let direction = if offset < chrono::Duration::zero() {
                "ahead of"
            } else {
                "behind"
            };
            println!(
                "Local clock is {} {} {}",
                format_duration(magnitude),
                direction,
                time.authority_name()
            );
            println!("Corrected time: {}", format_clock_time(&time.now()));
            if let Some(synced) = time.last_synced() {
                println!("Synced at: {} UTC", synced.format("%Y-%m-%d %H:%M:%S"));
            }
            Ok(())
        }
        TrackerEvent::TimeSyncFailed { reason, .. } => {
            bail!("Time sync with {} failed: {}", time.authority_name(), reason)
        }
        other => bail!("Unexpected sync result: {:?}", other),
    }
}

async fn play(tracker: &mut SessionTracker, activity: Option<String>) -> Result<()> {
    let activity = activity.unwrap_or_else(|| tracker.policy().default_activity().to_string());
    if !activity.is_empty() && !tracker.policy().activities.contains(&activity) {
        warn!(activity = %activity, "Activity is not in the configured list");
    }

    let events = tracker.start(activity.clone()).await?;
    events.iter().for_each(print_event);
    if let Some(session) = tracker.active_session() {
        println!(
            "Session {} started at {}. Press Enter or Ctrl-C to stop.",
            session.session_id.short(),
            session.started_at.format("%H:%M")
        );
    }

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut tick_timer = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping session");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping session");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, stopping session");
                break;
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => break,
                    // Detached from a terminal; only signals can stop the session
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin, stopping session");
                        break;
                    }
                }
            }
            _ = tick_timer.tick() => {
                match tracker.tick() {
                    Ok(report) => {
                        for event in &report.events {
                            print_event(event);
                        }
                        print!("\r{}", render::session_line(&activity, report.elapsed, &report.usage));
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => warn!(error = %e, "Tick failed"),
                }
            }
        }
    }
    println!();

    stop_with_retry(tracker).await
}

async fn stop_with_retry(tracker: &mut SessionTracker) -> Result<()> {
    let mut attempt = 1;
    loop {
        match tracker.stop() {
            Ok(stopped) => {
                stopped.events.iter().for_each(print_event);
                println!(
                    "Recorded {} min of {}.",
                    stopped.record.duration_minutes,
                    if stopped.record.activity.is_empty() {
                        "play"
                    } else {
                        stopped.record.activity.as_str()
                    }
                );
                return status(tracker, false);
            }
            Err(e) if attempt < STOP_ATTEMPTS => {
                error!(error = %e, attempt, "Failed to record session, retrying");
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => return Err(e).context("Failed to record session"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "playtime starting");
    if is_mock_time_active() {
        warn!("Mock time is active; the local clock is simulated");
    }

    let mut tracker = build_tracker(&args)?;

    match args.command {
        Command::Status { json } => status(&tracker, json),
        Command::Play { activity } => play(&mut tracker, activity).await,
        Command::History { limit } => history(&tracker, limit),
        Command::Sync => sync(&tracker).await,
    }
}
