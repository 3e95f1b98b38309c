// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded session database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sessions`: session id → serialized TransactionSession (JSON bytes)
//!
//! redb calls are blocking, so every operation runs on the blocking pool.
//! The compare-and-set in `update_status` happens inside one write
//! transaction; redb serializes writers, which makes it atomic.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{SessionStatus, SessionStore, StatusUpdate, StoreError, StoreResult, TransactionSession};

/// Primary table: session id → serialized TransactionSession.
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// redb failures, flattened into [`StoreError::Backend`] at the trait boundary.
#[derive(Debug, thiserror::Error)]
pub enum SessionDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SessionDbError> for StoreError {
    fn from(e: SessionDbError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

macro_rules! backend {
    ($expr:expr) => {
        $expr.map_err(|e| StoreError::from(SessionDbError::from(e)))
    };
}

/// Durable session store.
#[derive(Clone)]
pub struct RedbSessionStore {
    db: Arc<Database>,
}

impl RedbSessionStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, SessionDbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn create_blocking(db: &Database, session: TransactionSession) -> StoreResult<TransactionSession> {
    let json = serde_json::to_vec(&session)?;
    let write_txn = backend!(db.begin_write())?;
    {
        let mut table = backend!(write_txn.open_table(SESSIONS))?;
        if backend!(table.get(session.id.as_str()))?.is_some() {
            return Err(StoreError::AlreadyExists(session.id));
        }
        backend!(table.insert(session.id.as_str(), json.as_slice()))?;
    }
    backend!(write_txn.commit())?;
    Ok(session)
}

fn get_blocking(db: &Database, id: &str) -> StoreResult<Option<TransactionSession>> {
    let read_txn = backend!(db.begin_read())?;
    let table = backend!(read_txn.open_table(SESSIONS))?;
    match backend!(table.get(id))? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn update_blocking(
    db: &Database,
    id: &str,
    update: StatusUpdate,
    now: DateTime<Utc>,
) -> StoreResult<TransactionSession> {
    let write_txn = backend!(db.begin_write())?;
    let session = {
        let mut table = backend!(write_txn.open_table(SESSIONS))?;
        let mut session: TransactionSession = match backend!(table.get(id))? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StoreError::NotFound(id.to_string())),
        };

        if session.status != SessionStatus::Pending {
            return Err(StoreError::NotPending(session.status));
        }
        if session.is_expired(now) {
            return Err(StoreError::Expired(session.id));
        }

        session.apply(update, now);
        let json = serde_json::to_vec(&session)?;
        backend!(table.insert(id, json.as_slice()))?;
        session
    };
    backend!(write_txn.commit())?;
    Ok(session)
}

fn purge_blocking(db: &Database, cutoff: DateTime<Utc>) -> StoreResult<usize> {
    let write_txn = backend!(db.begin_write())?;
    let purged = {
        let mut table = backend!(write_txn.open_table(SESSIONS))?;

        let mut stale = Vec::new();
        for entry in backend!(table.iter())? {
            let (key, value) = backend!(entry)?;
            let session: TransactionSession = serde_json::from_slice(value.value())?;
            if session.expires_at < cutoff {
                stale.push(key.value().to_string());
            }
        }

        for id in &stale {
            backend!(table.remove(id.as_str()))?;
        }
        stale.len()
    };
    backend!(write_txn.commit())?;
    Ok(purged)
}

#[async_trait]
impl SessionStore for RedbSessionStore {
    async fn create(&self, session: TransactionSession) -> StoreResult<TransactionSession> {
        self.blocking(move |db| create_blocking(db, session)).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TransactionSession>> {
        let id = id.to_string();
        self.blocking(move |db| get_blocking(db, &id)).await
    }

    async fn update_status(
        &self,
        id: &str,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<TransactionSession> {
        let id = id.to_string();
        self.blocking(move |db| update_blocking(db, &id, update, now))
            .await
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.blocking(move |db| purge_blocking(db, cutoff)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{ChainType, NewSession, SessionType};
    use chrono::Duration;

    fn temp_store() -> (RedbSessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbSessionStore::open(&dir.path().join("sessions.redb")).unwrap();
        (store, dir)
    }

    fn pending(now: DateTime<Utc>) -> TransactionSession {
        TransactionSession::new(
            NewSession {
                session_type: SessionType::AddLiquidity,
                chain_type: ChainType::Ethereum,
                chain_id: 1,
                payload: serde_json::json!({ "pool": "WETH/USDC", "fee": 3000 }),
            },
            Duration::minutes(15),
            now,
        )
    }

    fn failed(hash: &str) -> StatusUpdate {
        StatusUpdate {
            status: SessionStatus::Failed,
            transaction_hash: hash.to_string(),
            contract_address: None,
        }
    }

    #[tokio::test]
    async fn create_get_and_update() {
        let (store, _dir) = temp_store();
        let now = Utc::now();
        let session = store.create(pending(now)).await.unwrap();

        let loaded = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);

        let updated = store
            .update_status(&session.id, failed("0x01"), now)
            .await
            .unwrap();
        assert_eq!(updated.status, SessionStatus::Failed);

        let err = store
            .update_status(&session.id, failed("0x02"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotPending(SessionStatus::Failed)));
    }

    #[tokio::test]
    async fn expired_session_is_not_updated() {
        let (store, _dir) = temp_store();
        let now = Utc::now();
        let session = store.create(pending(now)).await.unwrap();

        let err = store
            .update_status(&session.id, failed("0x01"), now + Duration::minutes(16))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Expired(_)));
        assert_eq!(
            store.get(&session.id).await.unwrap().unwrap().status,
            SessionStatus::Pending
        );
    }

    #[tokio::test]
    async fn duplicate_and_missing_ids() {
        let (store, _dir) = temp_store();
        let session = store.create(pending(Utc::now())).await.unwrap();

        assert!(matches!(
            store.create(session).await.unwrap_err(),
            StoreError::AlreadyExists(_)
        ));
        assert!(store.get("unknown").await.unwrap().is_none());
        assert!(matches!(
            store
                .update_status("unknown", failed("0x01"), Utc::now())
                .await
                .unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.redb");
        let id = {
            let store = RedbSessionStore::open(&path).unwrap();
            store.create(pending(Utc::now())).await.unwrap().id
        };

        let reopened = RedbSessionStore::open(&path).unwrap();
        let session = reopened.get(&id).await.unwrap().unwrap();
        assert_eq!(session.session_type, SessionType::AddLiquidity);
        assert_eq!(session.payload["fee"], 3000);
    }

    #[tokio::test]
    async fn purge_removes_only_old_sessions() {
        let (store, _dir) = temp_store();
        let now = Utc::now();
        let old = store.create(pending(now - Duration::days(1))).await.unwrap();
        let fresh = store.create(pending(now)).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.get(&old.id).await.unwrap().is_none());
        assert!(store.get(&fresh.id).await.unwrap().is_some());
    }
}
