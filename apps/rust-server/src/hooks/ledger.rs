// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reference hooks that record confirmed outcomes in an in-process ledger.
//!
//! Real deployments replace these with hooks that update their own domain
//! tables. The ledger is keyed by session id, so re-dispatching the same
//! confirmation overwrites rather than duplicates.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use super::{Hook, HookError, HookRegistry};
use crate::sessions::{SessionType, TransactionSession};

/// One recorded domain outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub session_id: String,
    pub session_type: SessionType,
    pub chain_id: u64,
    pub transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Hook-specific fields extracted from the session payload
    pub details: serde_json::Value,
}

/// In-memory record of confirmed outcomes.
#[derive(Default)]
pub struct ConfirmationLedger {
    entries: RwLock<HashMap<String, LedgerEntry>>,
}

impl ConfirmationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `entry.session_id`.
    ///
    /// Returns `true` when the session had no entry yet.
    pub async fn record(&self, entry: LedgerEntry) -> bool {
        self.entries
            .write()
            .await
            .insert(entry.session_id.clone(), entry)
            .is_none()
    }

    pub async fn get(&self, session_id: &str) -> Option<LedgerEntry> {
        self.entries.read().await.get(session_id).cloned()
    }

    pub async fn by_type(&self, session_type: SessionType) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.session_type == session_type)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn entry(
    session: &TransactionSession,
    session_type: SessionType,
    tx_hash: &str,
    contract_address: Option<&str>,
    details: serde_json::Value,
) -> LedgerEntry {
    LedgerEntry {
        session_id: session.id.clone(),
        session_type,
        chain_id: session.chain_id,
        transaction_hash: tx_hash.to_string(),
        contract_address: contract_address.map(str::to_string),
        details,
    }
}

fn payload_object(
    session: &TransactionSession,
) -> Result<&serde_json::Map<String, serde_json::Value>, HookError> {
    session.payload.as_object().ok_or_else(|| {
        HookError::InvalidPayload(format!(
            "{} payload must be a JSON object",
            session.session_type
        ))
    })
}

fn required_str<'a>(
    payload: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<&'a str, HookError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HookError::InvalidPayload(format!("missing string field `{field}`")))
}

/// Records contract deployments.
pub struct DeploymentHook {
    ledger: Arc<ConfirmationLedger>,
}

impl DeploymentHook {
    pub fn new(ledger: Arc<ConfirmationLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Hook for DeploymentHook {
    fn name(&self) -> &'static str {
        "deployment"
    }

    fn can_handle(&self, session_type: SessionType) -> bool {
        matches!(session_type, SessionType::Deploy | SessionType::DeployUniswap)
    }

    async fn on_confirmed(
        &self,
        session_type: SessionType,
        tx_hash: &str,
        contract_address: Option<&str>,
        session: &TransactionSession,
    ) -> Result<(), HookError> {
        let address = contract_address
            .map(|raw| {
                raw.parse::<Address>()
                    .map(|a| a.to_checksum(None))
                    .map_err(|e| HookError::InvalidPayload(format!("contract address: {e}")))
            })
            .transpose()?;

        let details = serde_json::json!({
            "template": session.payload.get("template").cloned(),
            "contracts": session.payload.get("contracts").cloned(),
        });

        self.ledger
            .record(entry(session, session_type, tx_hash, address.as_deref(), details))
            .await;
        Ok(())
    }
}

/// Records pool creation and liquidity changes.
pub struct LiquidityHook {
    ledger: Arc<ConfirmationLedger>,
}

impl LiquidityHook {
    pub fn new(ledger: Arc<ConfirmationLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Hook for LiquidityHook {
    fn name(&self) -> &'static str {
        "liquidity"
    }

    fn can_handle(&self, session_type: SessionType) -> bool {
        matches!(
            session_type,
            SessionType::CreatePool | SessionType::AddLiquidity | SessionType::RemoveLiquidity
        )
    }

    async fn on_confirmed(
        &self,
        session_type: SessionType,
        tx_hash: &str,
        contract_address: Option<&str>,
        session: &TransactionSession,
    ) -> Result<(), HookError> {
        let payload = payload_object(session)?;
        let details = serde_json::json!({
            "token0": required_str(payload, "token0")?,
            "token1": required_str(payload, "token1")?,
            "fee": payload.get("fee").cloned(),
            "amount0": payload.get("amount0").cloned(),
            "amount1": payload.get("amount1").cloned(),
        });

        self.ledger
            .record(entry(session, session_type, tx_hash, contract_address, details))
            .await;
        Ok(())
    }
}

/// Records swaps.
pub struct SwapHook {
    ledger: Arc<ConfirmationLedger>,
}

impl SwapHook {
    pub fn new(ledger: Arc<ConfirmationLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Hook for SwapHook {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn can_handle(&self, session_type: SessionType) -> bool {
        session_type == SessionType::Swap
    }

    async fn on_confirmed(
        &self,
        session_type: SessionType,
        tx_hash: &str,
        contract_address: Option<&str>,
        session: &TransactionSession,
    ) -> Result<(), HookError> {
        let payload = payload_object(session)?;
        let details = serde_json::json!({
            "tokenIn": required_str(payload, "tokenIn")?,
            "tokenOut": required_str(payload, "tokenOut")?,
            "amountIn": payload.get("amountIn").cloned(),
        });

        self.ledger
            .record(entry(session, session_type, tx_hash, contract_address, details))
            .await;
        Ok(())
    }
}

/// Registry with the three reference hooks covering every session type.
pub fn default_registry(ledger: Arc<ConfirmationLedger>) -> Result<HookRegistry, HookError> {
    HookRegistry::new()
        .with(Arc::new(DeploymentHook::new(ledger.clone())))?
        .with(Arc::new(LiquidityHook::new(ledger.clone())))?
        .with(Arc::new(SwapHook::new(ledger)))
}
