//! TourneySync Daemon - Background synchronization service
//!
//! This binary keeps a local tournament replica in step with the remote
//! store:
//! - Opens the SQLite replica and change queue
//! - Probes the remote store and feeds reachability into the engine
//! - Runs the periodic sync scheduler
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon builds its adapters, registers one `SyncEngine` in an
//! `EngineRegistry`, then waits on a `CancellationToken` that is
//! triggered on receipt of SIGTERM or SIGINT. `--once` runs a single
//! cycle and exits.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tourneysync_cache::{DatabasePool, SqliteChangeQueue, SqliteReplicaStore};
use tourneysync_conflict::ConflictResolver;
use tourneysync_core::config::{Config, LoggingConfig};
use tourneysync_remote::RestRemoteStore;
use tourneysync_sync::{
    ConflictNotice, ConnectivityMonitor, ConnectivitySignal, EngineDeps, EngineOptions,
    EngineRegistry, SyncReport, SyncState,
};

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "tourneysyncd",
    version,
    about = "Offline-first tournament data sync daemon"
)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `storage.database_path`
    #[arg(long)]
    database: Option<PathBuf>,

    /// Never contact the remote store; local writes stay queued
    #[arg(long)]
    offline: bool,

    /// Run one sync cycle and exit
    #[arg(long)]
    once: bool,
}

/// Loads, overrides and validates the configuration
///
/// An explicit `--config` must exist; the default location falls back
/// to built-in defaults.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    if let Some(database) = &args.database {
        config.storage.database_path = database.clone();
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration: {joined}");
    }

    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the database, the engine registry and the shutdown token
struct DaemonService {
    config: Config,
    db_pool: DatabasePool,
    registry: EngineRegistry,
    shutdown: CancellationToken,
    offline: bool,
    once: bool,
}

impl DaemonService {
    async fn new(config: Config, args: &Args, shutdown: CancellationToken) -> Result<Self> {
        let db_path = &config.storage.database_path;
        let db_pool = DatabasePool::new(db_path)
            .await
            .context("Failed to open database")?;
        info!(db_path = %db_path.display(), "Opened replica database");

        Ok(Self {
            config,
            db_pool,
            registry: EngineRegistry::new(),
            shutdown,
            offline: args.offline,
            once: args.once,
        })
    }

    fn engine_parts(&self, remote: Arc<RestRemoteStore>) -> Result<(EngineDeps, EngineOptions)> {
        let pool = self.db_pool.pool().clone();
        let deps = EngineDeps {
            remote,
            replica: Arc::new(SqliteReplicaStore::new(pool.clone())),
            queue: Arc::new(SqliteChangeQueue::new(pool)),
            resolver: ConflictResolver::try_from_config(&self.config.conflicts)
                .context("Invalid conflict strategy configuration")?,
        };

        let options = EngineOptions::from_config(&self.config)
            .with_initially_online(false)
            .with_on_status(Arc::new(|state: &SyncState| {
                info!(status = %state, "Sync status changed");
            }))
            .with_on_conflict(Arc::new(|notice: &ConflictNotice| {
                warn!(
                    table = %notice.table,
                    record_id = %notice.record_id,
                    "Conflict needs manual resolution"
                );
            }));

        Ok((deps, options))
    }

    /// Runs until shutdown, or for a single cycle with `--once`
    async fn run(self) -> Result<()> {
        let remote = Arc::new(
            RestRemoteStore::from_config(&self.config.remote)
                .context("Failed to build remote client")?,
        );
        let (deps, options) = self.engine_parts(Arc::clone(&remote))?;

        if self.once {
            let online = !self.offline && remote.probe().await;
            let engine = self
                .registry
                .initialize(deps, options.with_initially_online(online));
            match engine.sync().await {
                Some(report) => log_report(&report),
                None => info!(online, "Sync cycle skipped"),
            }
            self.registry.stop();
            self.db_pool.close().await;
            return Ok(());
        }

        let engine = self.registry.initialize(deps, options);
        let signal = ConnectivitySignal::new(false);
        let monitor = ConnectivityMonitor::spawn(
            Arc::clone(&engine),
            signal.subscribe(),
            self.shutdown.child_token(),
        );

        let prober = if self.offline {
            info!("Offline mode: remote store will not be contacted");
            None
        } else {
            let period = Duration::from_secs(self.config.remote.probe_interval_secs.max(1));
            Some(tokio::spawn(run_probe_loop(
                remote,
                signal.clone(),
                period,
                self.shutdown.child_token(),
            )))
        };

        engine.start();
        info!(
            interval_ms = self.config.sync.interval_ms,
            tables = ?self.config.sync.tables,
            "Sync engine started"
        );

        self.shutdown.cancelled().await;
        info!("Shutdown requested, stopping sync engine");

        self.registry.stop();
        if let Err(e) = monitor.await {
            warn!(error = %e, "Connectivity monitor ended abnormally");
        }
        if let Some(prober) = prober {
            if let Err(e) = prober.await {
                warn!(error = %e, "Probe loop ended abnormally");
            }
        }
        self.db_pool.close().await;

        Ok(())
    }
}

fn log_report(report: &SyncReport) {
    info!(
        pushed = report.pushed,
        push_failed = report.push_failed,
        permanently_failed = report.permanently_failed,
        pulled_inserts = report.pulled_inserts,
        overwritten = report.overwritten,
        conflicts_resolved = report.conflicts_resolved,
        conflicts_need_action = report.conflicts_need_action,
        tables_skipped = report.tables_skipped,
        duration_ms = report.duration_ms,
        "Sync cycle finished"
    );
    for err in &report.errors {
        warn!(error = %err, "Sync cycle error");
    }
}

/// Probes the remote store every `period` and publishes reachability
async fn run_probe_loop(
    remote: Arc<RestRemoteStore>,
    signal: ConnectivitySignal,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let online = remote.probe().await;
                if online != signal.is_online() {
                    info!(online, base_url = remote.client().base_url(), "Remote reachability changed");
                }
                signal.set(online);
            }
            _ = cancel.cancelled() => break,
        }
    }
}

// ============================================================================
// Signal handling
// ============================================================================

/// Waits for SIGINT or SIGTERM and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config.logging);

    info!("TourneySync daemon starting (tourneysyncd)");

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, &args, shutdown_token).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("TourneySync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "TourneySync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
