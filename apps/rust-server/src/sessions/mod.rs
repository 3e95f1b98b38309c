// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Store
//!
//! Sessions are created by domain actions and then read and mutated only by
//! the confirmation handler. The store contract is deliberately small:
//! create, get, a compare-and-set status update from `pending`, and a purge
//! used by the optional reaper.
//!
//! Two implementations ship with the server:
//! - [`InMemorySessionStore`] for tests and single-process deployments
//! - [`RedbSessionStore`], an embedded ACID database under `DATA_DIR`

pub mod database;
pub mod memory;
pub mod model;
pub mod reaper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use database::RedbSessionStore;
pub use memory::InMemorySessionStore;
pub use model::{
    ChainType, NewSession, SessionStatus, SessionType, StatusUpdate, TransactionSession,
    UnknownSessionType,
};
pub use reaper::SessionReaper;

/// Session store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("session is not pending (current status: {0})")]
    NotPending(SessionStatus),

    #[error("session expired: {0}")]
    Expired(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for transaction sessions.
///
/// `get` returns the stored record; callers apply lazy expiry with
/// [`TransactionSession::observed_at`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session.
    async fn create(&self, session: TransactionSession) -> StoreResult<TransactionSession>;

    /// Load a session by id.
    async fn get(&self, id: &str) -> StoreResult<Option<TransactionSession>>;

    /// Write an outcome onto a session that is still pending at `now`.
    ///
    /// Fails with [`StoreError::NotPending`] if another writer got there first
    /// and with [`StoreError::Expired`] once `now` reaches `expires_at`.
    async fn update_status(
        &self,
        id: &str,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<TransactionSession>;

    /// Delete sessions whose `expires_at` is before `cutoff`. Returns the count.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}
