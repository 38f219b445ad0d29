//! Shared fixtures for sync engine tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use serde_json::{json, Value};

use tourneysync_cache::{DatabasePool, SqliteChangeQueue, SqliteReplicaStore};
use tourneysync_conflict::ConflictResolver;
use tourneysync_core::domain::{EntityTable, RecordFields, ServerId};
use tourneysync_core::ports::{IRemoteStore, RemoteRecord};
use tourneysync_core::usecases::MutateRecordUseCase;
use tourneysync_sync::{EngineDeps, EngineOptions, SyncEngine};

/// Payload key that makes the mock reject a write
pub const REJECT_KEY: &str = "reject";

/// In-memory remote store
#[derive(Default)]
pub struct MockRemoteStore {
    tables: Mutex<HashMap<EntityTable, Vec<RemoteRecord>>>,
    next_id: AtomicU64,
    failing_selects: Mutex<HashSet<EntityTable>>,
    select_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: EntityTable, records: Vec<Value>) {
        let rows = records.into_iter().map(fields).collect();
        self.tables.lock().unwrap().insert(table, rows);
    }

    pub fn rows(&self, table: EntityTable) -> Vec<RemoteRecord> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_select(&self, table: EntityTable) {
        self.failing_selects.lock().unwrap().insert(table);
    }

    pub fn set_select_delay(&self, delay: Duration) {
        *self.select_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MockRemoteStore {
    async fn select(&self, table: EntityTable) -> anyhow::Result<Vec<RemoteRecord>> {
        self.record_call(format!("select {table}"));
        let delay = *self.select_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_selects.lock().unwrap().contains(&table) {
            bail!("HTTP 503: {table} unavailable");
        }
        Ok(self.rows(table))
    }

    async fn insert(
        &self,
        table: EntityTable,
        payload: &RecordFields,
    ) -> anyhow::Result<Option<RemoteRecord>> {
        if payload.contains_key(REJECT_KEY) {
            self.record_call(format!("insert {table} rejected"));
            bail!("HTTP 400: rejected payload");
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record_call(format!("insert {table} {id}"));

        let mut row = payload.clone();
        row.insert("id".to_string(), json!(id));
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(Some(row))
    }

    async fn update(
        &self,
        table: EntityTable,
        id: &ServerId,
        payload: &RecordFields,
    ) -> anyhow::Result<()> {
        if payload.contains_key(REJECT_KEY) {
            self.record_call(format!("update {table} {id} rejected"));
            bail!("HTTP 400: rejected payload");
        }
        self.record_call(format!("update {table} {id}"));
        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|row| row.get("id") == Some(&id.to_json()))
        {
            for (key, value) in payload {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: EntityTable, id: &ServerId) -> anyhow::Result<()> {
        self.record_call(format!("delete {table} {id}"));
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .retain(|row| row.get("id") != Some(&id.to_json()));
        Ok(())
    }
}

pub fn fields(value: Value) -> RecordFields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

/// Engine wired to an in-memory SQLite replica and queue
pub struct Harness {
    pub remote: Arc<MockRemoteStore>,
    pub replica: Arc<SqliteReplicaStore>,
    pub queue: Arc<SqliteChangeQueue>,
    pub usecase: MutateRecordUseCase,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        let replica = Arc::new(SqliteReplicaStore::new(pool.pool().clone()));
        let queue = Arc::new(SqliteChangeQueue::new(pool.pool().clone()));
        let usecase = MutateRecordUseCase::new(replica.clone(), queue.clone());
        Self {
            remote: Arc::new(MockRemoteStore::new()),
            replica,
            queue,
            usecase,
        }
    }

    pub fn deps(&self) -> EngineDeps {
        EngineDeps {
            remote: self.remote.clone(),
            replica: self.replica.clone(),
            queue: self.queue.clone(),
            resolver: ConflictResolver::default(),
        }
    }

    pub fn engine(&self, options: EngineOptions) -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(self.deps(), options))
    }
}
