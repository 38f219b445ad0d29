//! Offline-first synchronization engine
//!
//! The [`SyncEngine`] keeps the local replica consistent with the remote
//! store under intermittent connectivity.
//!
//! ## Sync Flow
//!
//! 1. **Guard**: return immediately when offline or a cycle is in flight
//! 2. **Push**: drain the change queue in FIFO order; failures are recorded
//!    per entry and never abort the cycle
//! 3. **Pull**: fetch each configured table; new records are inserted,
//!    diverged ones go through the conflict resolver, the rest overwrite
//!    the local copy
//!
//! A table that cannot be fetched is skipped. Any other error aborts the
//! cycle and leaves the engine in the `error` state until the next cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tourneysync_conflict::{ConflictDetector, ConflictResolver, DetectionResult};
use tourneysync_core::config::Config;
use tourneysync_core::domain::{
    now_millis, parse_server_timestamp, ChangeQueueEntry, DomainError, EntityPatch, EntityTable,
    LocalId, NewEntity, Operation, RecordStatus, ServerId, SyncedEntity, ID_FIELD,
};
use tourneysync_core::ports::{IChangeQueue, IRemoteStore, IReplicaStore, RemoteRecord};

use crate::report::SyncReport;
use crate::state::{ConflictNotice, SyncState};
use crate::SyncError;

/// Invoked with every new engine status
pub type StatusCallback = Arc<dyn Fn(&SyncState) + Send + Sync>;

/// Invoked when a conflict resolution needs a human
pub type ConflictCallback = Arc<dyn Fn(&ConflictNotice) + Send + Sync>;

// ============================================================================
// Construction inputs
// ============================================================================

/// Collaborators the engine drives
pub struct EngineDeps {
    pub remote: Arc<dyn IRemoteStore + Send + Sync>,
    pub replica: Arc<dyn IReplicaStore + Send + Sync>,
    pub queue: Arc<dyn IChangeQueue + Send + Sync>,
    pub resolver: ConflictResolver,
}

/// Tunables and callbacks
#[derive(Clone)]
pub struct EngineOptions {
    /// Period of the automatic sync timer
    pub interval: Duration,
    /// Tables pulled each cycle, in order
    pub tables: Vec<EntityTable>,
    /// Remote column holding the server-side modification time
    pub server_timestamp_field: String,
    /// Connectivity at construction time
    pub initially_online: bool,
    pub on_status: Option<StatusCallback>,
    pub on_conflict: Option<ConflictCallback>,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_millis(config.sync.interval_ms),
            tables: config.sync_tables(),
            server_timestamp_field: config.sync.server_timestamp_field.clone(),
            ..Self::default()
        }
    }

    pub fn with_initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_tables(mut self, tables: &[EntityTable]) -> Self {
        self.tables = tables.to_vec();
        self
    }

    pub fn with_on_status(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn with_on_conflict(mut self, callback: ConflictCallback) -> Self {
        self.on_conflict = Some(callback);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(30_000),
            tables: EntityTable::ALL.to_vec(),
            server_timestamp_field: "updated_at".to_string(),
            initially_online: true,
            on_status: None,
            on_conflict: None,
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Bidirectional sync between the local replica and the remote store
///
/// One cycle runs at a time per engine. Both the periodic timer and
/// manual [`sync`](SyncEngine::sync) calls go through the same guard, so
/// a trigger during an active cycle is a no-op.
pub struct SyncEngine {
    remote: Arc<dyn IRemoteStore + Send + Sync>,
    replica: Arc<dyn IReplicaStore + Send + Sync>,
    queue: Arc<dyn IChangeQueue + Send + Sync>,
    resolver: ConflictResolver,
    detector: ConflictDetector,
    interval: Duration,
    tables: Vec<EntityTable>,
    server_timestamp_field: String,
    online: AtomicBool,
    state: watch::Sender<SyncState>,
    on_status: Option<StatusCallback>,
    on_conflict: Option<ConflictCallback>,
    /// Cancels the periodic timer task while it is armed
    scheduler: Mutex<Option<CancellationToken>>,
}

impl SyncEngine {
    pub fn new(deps: EngineDeps, options: EngineOptions) -> Self {
        let initial = if options.initially_online {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        let (state, _) = watch::channel(initial);

        info!(
            interval_ms = options.interval.as_millis() as u64,
            tables = options.tables.len(),
            online = options.initially_online,
            "Creating sync engine"
        );

        Self {
            remote: deps.remote,
            replica: deps.replica,
            queue: deps.queue,
            resolver: deps.resolver,
            detector: ConflictDetector::new(),
            interval: options.interval,
            tables: options.tables,
            server_timestamp_field: options.server_timestamp_field,
            online: AtomicBool::new(options.initially_online),
            state,
            on_status: options.on_status,
            on_conflict: options.on_conflict,
            scheduler: Mutex::new(None),
        }
    }

    // ========================================================================
    // Status accessors
    // ========================================================================

    pub fn status(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn is_online_now(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn publish(&self, state: &SyncState) {
        if let Some(callback) = &self.on_status {
            callback(state);
        }
    }

    fn set_state(&self, new_state: SyncState) {
        self.state.send_replace(new_state.clone());
        self.publish(&new_state);
    }

    /// Changes the status unless a cycle is in flight
    fn set_state_unless_syncing(&self, new_state: SyncState) {
        let changed = self.state.send_if_modified(|current| {
            if current.is_syncing() || *current == new_state {
                false
            } else {
                *current = new_state.clone();
                true
            }
        });
        if changed {
            self.publish(&new_state);
        }
    }

    /// Compare-and-set into `syncing`; false when a cycle is already running
    fn try_begin_cycle(&self) -> bool {
        let acquired = self.state.send_if_modified(|current| {
            if current.is_syncing() {
                false
            } else {
                *current = SyncState::Syncing;
                true
            }
        });
        if acquired {
            self.publish(&SyncState::Syncing);
        }
        acquired
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Records a connectivity transition
    ///
    /// Going online sets `idle` and runs a cycle right away; going offline
    /// sets `offline` and suppresses automatic cycles. Repeating the
    /// current value does nothing.
    pub async fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::AcqRel);
        if was_online == online {
            return;
        }

        if online {
            info!("Connectivity restored");
            self.set_state_unless_syncing(SyncState::Idle);
            self.sync().await;
        } else {
            info!("Connectivity lost, pausing sync");
            self.set_state_unless_syncing(SyncState::Offline);
        }
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    fn scheduler_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one cycle now and then every interval while online
    ///
    /// Calling `start` on a running engine does nothing.
    pub fn start(self: &Arc<Self>) {
        let token = {
            let mut slot = self.scheduler_slot();
            if slot.is_some() {
                debug!("Sync engine already running");
                return;
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            token
        };

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting sync scheduler"
        );
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_scheduler(token).await });
    }

    /// Disarms the timer; an in-flight cycle runs to completion
    pub fn stop(&self) {
        if let Some(token) = self.scheduler_slot().take() {
            info!("Stopping sync scheduler");
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler_slot().is_some()
    }

    async fn run_scheduler(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_online_now() && !self.status().is_syncing() {
                        self.sync().await;
                    }
                }
                _ = token.cancelled() => break,
            }
        }

        debug!("Sync scheduler stopped");
    }

    // ========================================================================
    // Sync cycle
    // ========================================================================

    /// Runs one push/pull cycle
    ///
    /// Returns `None` when offline or when another cycle is in flight. An
    /// aborted cycle still returns its partial report, with the abort
    /// reason as the last error, and leaves the engine in `error`.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> Option<SyncReport> {
        if !self.is_online_now() {
            debug!("Offline, skipping sync");
            return None;
        }
        if !self.try_begin_cycle() {
            debug!("Sync already in progress");
            return None;
        }

        let start = Instant::now();
        let mut report = SyncReport::default();
        info!("Starting sync cycle");

        let outcome = self.run_cycle(&mut report).await;
        report.duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                info!(
                    pushed = report.pushed,
                    push_failed = report.push_failed,
                    pulled = report.pulled_inserts,
                    overwritten = report.overwritten,
                    conflicts = report.conflicts_resolved + report.conflicts_need_action,
                    errors = report.errors.len(),
                    duration_ms = report.duration_ms,
                    "Sync cycle completed"
                );
                let next = if self.is_online_now() {
                    SyncState::Idle
                } else {
                    SyncState::Offline
                };
                self.set_state(next);
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "Sync cycle failed");
                report.errors.push(message.clone());
                self.set_state(SyncState::Error(message));
            }
        }

        Some(report)
    }

    async fn run_cycle(&self, report: &mut SyncReport) -> Result<()> {
        self.push_changes(report).await?;
        self.pull_changes(report).await
    }

    // ========================================================================
    // Push phase
    // ========================================================================

    #[tracing::instrument(skip(self, report))]
    async fn push_changes(&self, report: &mut SyncReport) -> Result<()> {
        let pending = self
            .queue
            .list_pending()
            .await
            .context("Failed to list pending changes")?;
        debug!(count = pending.len(), "Pushing queued changes");

        for entry in pending {
            if entry.is_permanently_failed() {
                report.skipped_failed += 1;
                continue;
            }

            match self.push_entry(&entry).await {
                Ok(()) => {
                    self.queue
                        .dequeue(entry.id)
                        .await
                        .context("Failed to dequeue pushed change")?;
                    report.pushed += 1;
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(
                        entry_id = %entry.id,
                        table = %entry.table,
                        operation = %entry.operation,
                        error = %message,
                        "Push failed"
                    );
                    report.errors.push(format!(
                        "{} {} #{}: {message}",
                        entry.operation, entry.table, entry.local_id
                    ));

                    let can_retry = self
                        .queue
                        .mark_failed(entry.id, &message)
                        .await
                        .context("Failed to record push failure")?;
                    if can_retry {
                        report.push_failed += 1;
                    } else {
                        report.permanently_failed += 1;
                        self.patch_local(
                            entry.table,
                            entry.local_id,
                            &EntityPatch::new().with_status(RecordStatus::Error),
                        )
                        .await?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn push_entry(&self, entry: &ChangeQueueEntry) -> Result<()> {
        match entry.operation {
            Operation::Insert => {
                let echoed = self.remote.insert(entry.table, &entry.payload).await?;
                let server_id = echoed
                    .as_ref()
                    .and_then(|row| row.get(ID_FIELD))
                    .and_then(ServerId::from_json);

                match server_id {
                    Some(id) => {
                        let mut patch = EntityPatch::new()
                            .with_id(id)
                            .with_status(RecordStatus::Synced);
                        if let Some(ts) = echoed
                            .as_ref()
                            .and_then(|row| row.get(&self.server_timestamp_field))
                            .and_then(parse_server_timestamp)
                        {
                            patch = patch.with_server_timestamp(ts);
                        }
                        self.patch_local(entry.table, entry.local_id, &patch).await?;
                    }
                    None => {
                        warn!(
                            table = %entry.table,
                            local_id = %entry.local_id,
                            "Remote insert returned no id"
                        );
                    }
                }
            }
            Operation::Update => {
                let id = self.record_id_for(entry).await?;
                self.remote.update(entry.table, &id, &entry.payload).await?;
                self.patch_local(
                    entry.table,
                    entry.local_id,
                    &EntityPatch::new().with_status(RecordStatus::Synced),
                )
                .await?;
            }
            Operation::Delete => {
                let id = self.record_id_for(entry).await?;
                self.remote.delete(entry.table, &id).await?;
                self.replica.delete(entry.table, entry.local_id).await?;
            }
        }

        debug!(
            entry_id = %entry.id,
            table = %entry.table,
            operation = %entry.operation,
            "Change pushed"
        );
        Ok(())
    }

    /// Server id for an update/delete
    ///
    /// Entries queued before their insert was acknowledged carry no id;
    /// the local record has it by now if the insert went through.
    async fn record_id_for(&self, entry: &ChangeQueueEntry) -> Result<ServerId> {
        if let Some(id) = &entry.record_id {
            return Ok(id.clone());
        }

        let local = self.replica.get(entry.table, entry.local_id).await?;
        local
            .and_then(|record| record.id)
            .ok_or_else(|| {
                SyncError::from(DomainError::MissingRecordId {
                    table: entry.table.to_string(),
                    local_id: entry.local_id.value(),
                })
                .into()
            })
    }

    /// Patches a local record; a record deleted meanwhile is not an error
    async fn patch_local(
        &self,
        table: EntityTable,
        local_id: LocalId,
        patch: &EntityPatch,
    ) -> Result<()> {
        match self.replica.update(table, local_id, patch).await {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.downcast_ref::<DomainError>(),
                    Some(DomainError::NotFound { .. })
                ) =>
            {
                debug!(%table, %local_id, "Local record gone, nothing to patch");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Pull phase
    // ========================================================================

    #[tracing::instrument(skip(self, report))]
    async fn pull_changes(&self, report: &mut SyncReport) -> Result<()> {
        for &table in &self.tables {
            let records = match self.remote.select(table).await {
                Ok(records) => records,
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(%table, error = %message, "Pull failed, skipping table");
                    report.errors.push(format!("pull {table}: {message}"));
                    report.tables_skipped += 1;
                    continue;
                }
            };

            debug!(%table, count = records.len(), "Pulled remote snapshot");
            for record in &records {
                self.pull_record(table, record, report).await?;
            }
        }

        Ok(())
    }

    async fn pull_record(
        &self,
        table: EntityTable,
        record: &RemoteRecord,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Some(server_id) = record.get(ID_FIELD).and_then(ServerId::from_json) else {
            let err = SyncError::RemoteRecordWithoutId { table };
            warn!(%table, "{err}");
            report.errors.push(err.to_string());
            return Ok(());
        };

        let existing = self
            .replica
            .find_by_server_id(table, &server_id)
            .await
            .with_context(|| format!("Failed to look up {table}/{server_id}"))?;

        let Some(local) = existing else {
            let server =
                SyncedEntity::from_remote(record, LocalId::new(0), &self.server_timestamp_field);
            let mut new = NewEntity::from(server);
            new.last_modified = now_millis();
            new.server_timestamp = new.server_timestamp.or_else(|| Some(Utc::now()));
            self.replica
                .insert(table, new)
                .await
                .with_context(|| format!("Failed to insert pulled {table}/{server_id}"))?;
            report.pulled_inserts += 1;
            return Ok(());
        };

        // Local bookkeeping survives whichever version ends up stored
        let mut server =
            SyncedEntity::from_remote(record, local.local_id, &self.server_timestamp_field);
        server.last_modified = local.last_modified;

        match self.detector.check(table, &local, &server) {
            DetectionResult::AwaitingUser => {
                debug!(%table, record_id = %server_id, "Conflict still awaiting user action");
            }
            DetectionResult::Conflicted(conflict) => {
                let resolution = self.resolver.resolve(&conflict, None);
                let mut resolved = resolution.resolved;

                if resolution.requires_user_action {
                    resolved.sync_status = RecordStatus::Conflict;
                    report.conflicts_need_action += 1;
                    warn!(
                        %table,
                        record_id = %server_id,
                        strategy = %resolution.strategy,
                        "Conflict needs user action"
                    );
                } else {
                    report.conflicts_resolved += 1;
                }

                self.replica
                    .replace(table, &resolved)
                    .await
                    .with_context(|| format!("Failed to store resolved {table}/{server_id}"))?;

                if resolution.requires_user_action {
                    if let Some(callback) = &self.on_conflict {
                        let conflict = *conflict;
                        callback(&ConflictNotice {
                            table,
                            record_id: conflict.record_id,
                            local_version: conflict.local_version,
                            server_version: conflict.server_version,
                            resolved,
                        });
                    }
                }
            }
            DetectionResult::NoConflict => {
                // Applied after detection: a missing server timestamp never conflicts
                if server.server_timestamp.is_none() {
                    server.server_timestamp = local.server_timestamp;
                }
                if server != local {
                    self.replica
                        .replace(table, &server)
                        .await
                        .with_context(|| format!("Failed to overwrite {table}/{server_id}"))?;
                    report.overwritten += 1;
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("interval", &self.interval)
            .field("tables", &self.tables)
            .field("online", &self.is_online_now())
            .field("state", &self.status())
            .finish_non_exhaustive()
    }
}
