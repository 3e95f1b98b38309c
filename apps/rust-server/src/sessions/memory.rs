// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{SessionStatus, SessionStore, StatusUpdate, StoreError, StoreResult, TransactionSession};

/// Session store held entirely in process memory.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, TransactionSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: TransactionSession) -> StoreResult<TransactionSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::AlreadyExists(session.id));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TransactionSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<TransactionSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if session.status != SessionStatus::Pending {
            return Err(StoreError::NotPending(session.status));
        }
        if session.is_expired(now) {
            return Err(StoreError::Expired(session.id.clone()));
        }

        session.apply(update, now);
        Ok(session.clone())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= cutoff);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{ChainType, NewSession, SessionType};
    use chrono::Duration;
    use std::sync::Arc;

    fn pending(now: DateTime<Utc>) -> TransactionSession {
        TransactionSession::new(
            NewSession {
                session_type: SessionType::Deploy,
                chain_type: ChainType::Ethereum,
                chain_id: 11155111,
                payload: serde_json::json!({ "template": "erc20" }),
            },
            Duration::minutes(15),
            now,
        )
    }

    fn confirm(hash: &str) -> StatusUpdate {
        StatusUpdate {
            status: SessionStatus::Confirmed,
            transaction_hash: hash.to_string(),
            contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemorySessionStore::new();
        let session = store.create(pending(Utc::now())).await.unwrap();

        let loaded = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemorySessionStore::new();
        let session = store.create(pending(Utc::now())).await.unwrap();
        let err = store.create(session).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_applies_once() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let session = store.create(pending(now)).await.unwrap();

        let updated = store
            .update_status(&session.id, confirm("0xaa"), now)
            .await
            .unwrap();
        assert_eq!(updated.status, SessionStatus::Confirmed);
        assert_eq!(updated.transaction_hash.as_deref(), Some("0xaa"));

        let err = store
            .update_status(&session.id, confirm("0xbb"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotPending(SessionStatus::Confirmed)));

        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.transaction_hash.as_deref(), Some("0xaa"));
    }

    #[tokio::test]
    async fn update_after_expiry_is_refused() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let session = store.create(pending(now)).await.unwrap();

        let err = store
            .update_status(&session.id, confirm("0xaa"), session.expires_at)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Expired(_)));

        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Pending);
        assert!(stored.transaction_hash.is_none());
    }

    #[tokio::test]
    async fn update_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store
            .update_status("nope", confirm("0xaa"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_updates_have_a_single_winner() {
        let store = Arc::new(InMemorySessionStore::new());
        let now = Utc::now();
        let session = store.create(pending(now)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                store.update_status(&id, confirm(&format!("0x{i:02x}")), now).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn purge_removes_only_old_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let old = store.create(pending(now - Duration::hours(2))).await.unwrap();
        let fresh = store.create(pending(now)).await.unwrap();

        let purged = store.purge_expired(now - Duration::hours(1)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get(&old.id).await.unwrap().is_none());
        assert!(store.get(&fresh.id).await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }
}
