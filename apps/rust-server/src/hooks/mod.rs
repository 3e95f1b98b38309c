// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Hooks
//!
//! A hook turns a confirmed transaction into a domain-state update (a
//! recorded deployment, a pool, a swap). Each hook claims one or more
//! [`SessionType`]s; the [`HookRegistry`] guarantees that every type is
//! claimed by at most one hook and routes confirmations accordingly.
//!
//! Hooks are invoked at least once per confirmation: a client retrying a
//! confirmation with the same transaction hash re-runs the hook, so
//! implementations must be idempotent per session id.

pub mod ledger;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::sessions::{SessionType, TransactionSession};

pub use ledger::{
    default_registry, ConfirmationLedger, DeploymentHook, LedgerEntry, LiquidityHook, SwapHook,
};

/// Hook registration and dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("session type {session_type} is claimed by both {existing} and {new}")]
    Conflict {
        session_type: SessionType,
        existing: &'static str,
        new: &'static str,
    },

    #[error("no hook registered for session type {0}")]
    Unhandled(SessionType),

    #[error("invalid session payload: {0}")]
    InvalidPayload(String),

    #[error("hook failed: {0}")]
    Failed(String),
}

/// Domain updater for confirmed transactions.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Short name used in logs and conflict errors.
    fn name(&self) -> &'static str;

    fn can_handle(&self, session_type: SessionType) -> bool;

    /// Apply a confirmed transaction to domain state.
    async fn on_confirmed(
        &self,
        session_type: SessionType,
        tx_hash: &str,
        contract_address: Option<&str>,
        session: &TransactionSession,
    ) -> Result<(), HookError>;
}

/// Session type → hook routing table.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<SessionType, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for every session type it claims.
    ///
    /// Registration is all-or-nothing: if any claimed type already has a
    /// hook, nothing is registered and a [`HookError::Conflict`] is returned.
    pub fn register(&mut self, hook: Arc<dyn Hook>) -> Result<(), HookError> {
        let claimed: Vec<SessionType> = SessionType::ALL
            .into_iter()
            .filter(|t| hook.can_handle(*t))
            .collect();

        for session_type in &claimed {
            if let Some(existing) = self.hooks.get(session_type) {
                return Err(HookError::Conflict {
                    session_type: *session_type,
                    existing: existing.name(),
                    new: hook.name(),
                });
            }
        }

        debug!(hook = hook.name(), types = ?claimed, "Registered hook");
        for session_type in claimed {
            self.hooks.insert(session_type, hook.clone());
        }
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, hook: Arc<dyn Hook>) -> Result<Self, HookError> {
        self.register(hook)?;
        Ok(self)
    }

    pub fn hook_for(&self, session_type: SessionType) -> Option<&Arc<dyn Hook>> {
        self.hooks.get(&session_type)
    }

    /// Session types no registered hook claims.
    pub fn unclaimed_types(&self) -> Vec<SessionType> {
        SessionType::ALL
            .into_iter()
            .filter(|t| !self.hooks.contains_key(t))
            .collect()
    }

    /// Route a confirmed session to its hook. Returns the hook's name.
    pub async fn dispatch(&self, session: &TransactionSession) -> Result<&'static str, HookError> {
        let hook = self
            .hook_for(session.session_type)
            .ok_or(HookError::Unhandled(session.session_type))?;

        let tx_hash = session.transaction_hash.as_deref().ok_or_else(|| {
            HookError::InvalidPayload("session has no transaction hash".to_string())
        })?;

        hook.on_confirmed(
            session.session_type,
            tx_hash,
            session.contract_address.as_deref(),
            session,
        )
        .await?;

        info!(
            hook = hook.name(),
            session_id = %session.id,
            session_type = %session.session_type,
            tx_hash = %tx_hash,
            "Hook applied confirmation"
        );
        Ok(hook.name())
    }
}
