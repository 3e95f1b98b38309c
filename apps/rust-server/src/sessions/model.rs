// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction session records.
//!
//! A session represents one client-initiated blockchain action awaiting
//! confirmation. Expiry is evaluated lazily: a pending session read after
//! `expires_at` reports [`SessionStatus::Expired`] even though the stored
//! status still says pending.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of on-chain action a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Contract deployment from a template
    Deploy,
    /// Uniswap factory/router deployment
    DeployUniswap,
    CreatePool,
    AddLiquidity,
    RemoveLiquidity,
    Swap,
}

impl SessionType {
    /// Every known session type, in declaration order.
    pub const ALL: [SessionType; 6] = [
        SessionType::Deploy,
        SessionType::DeployUniswap,
        SessionType::CreatePool,
        SessionType::AddLiquidity,
        SessionType::RemoveLiquidity,
        SessionType::Swap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Deploy => "deploy",
            SessionType::DeployUniswap => "deploy_uniswap",
            SessionType::CreatePool => "create_pool",
            SessionType::AddLiquidity => "add_liquidity",
            SessionType::RemoveLiquidity => "remove_liquidity",
            SessionType::Swap => "swap",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown session type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown session type: {0}")]
pub struct UnknownSessionType(pub String);

impl FromStr for SessionType {
    type Err = UnknownSessionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSessionType(s.to_string()))
    }
}

/// Chain family a session targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    #[default]
    Ethereum,
    Solana,
}

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Awaiting confirmation
    #[default]
    Pending,
    /// Transaction reported as successful
    Confirmed,
    /// Transaction reported as failed
    Failed,
    /// Pending session read after its expiry
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::Failed => "failed",
            SessionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored transaction session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSession {
    /// Opaque, unguessable identifier
    pub id: String,
    pub session_type: SessionType,
    #[serde(default)]
    pub chain_type: ChainType,
    pub chain_id: u64,
    /// Domain data, interpreted only by hooks
    #[schema(value_type = Object)]
    #[serde(default)]
    pub payload: serde_json::Value,
    pub status: SessionStatus,
    /// Set on confirmation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Set on confirmation when the client reports a created contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for a new session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_type: SessionType,
    pub chain_type: ChainType,
    pub chain_id: u64,
    pub payload: serde_json::Value,
}

/// Outcome written onto a pending session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: SessionStatus,
    pub transaction_hash: String,
    pub contract_address: Option<String>,
}

impl TransactionSession {
    /// Create a pending session expiring `ttl` after `now`.
    pub fn new(params: NewSession, ttl: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_type: params.session_type,
            chain_type: params.chain_type,
            chain_id: params.chain_id,
            payload: params.payload,
            status: SessionStatus::Pending,
            transaction_hash: None,
            contract_address: None,
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a pending session has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Pending && now >= self.expires_at
    }

    /// Status as observed at `now`, applying lazy expiry.
    ///
    /// Terminal statuses are never rewritten.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.is_expired(now) {
            SessionStatus::Expired
        } else {
            self.status
        }
    }

    /// Copy of this session with its status evaluated at `now`.
    pub fn observed_at(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    /// Apply a confirmation outcome.
    pub(crate) fn apply(&mut self, update: StatusUpdate, now: DateTime<Utc>) {
        self.status = update.status;
        self.transaction_hash = Some(update.transaction_hash);
        self.contract_address = update.contract_address;
        self.updated_at = now;
    }
}
