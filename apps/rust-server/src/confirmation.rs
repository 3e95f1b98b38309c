// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Confirmation
//!
//! Records the outcome of a client-executed transaction against its session
//! and hands confirmed transactions to the domain hook for the session type.
//!
//! ## Protocol
//!
//! 1. Validate the report (type, status, hash, contract address, signature)
//! 2. Load the session; unknown → not found
//! 3. The session type must match the type in the URL
//! 4. A session already confirmed with the same hash is a retry: the hook
//!    runs again. Any other non-pending session is a conflict
//! 5. A pending session past its expiry → expired
//! 6. Optional ownership proof: the transaction sender must have signed
//!    [`confirmation_message`]
//! 7. Compare-and-set the outcome from `pending`, refusing a session that
//!    expired during step 6
//! 8. Confirmed outcomes are dispatched to exactly one hook. Hook errors are
//!    returned to the caller; the status write stays committed

use std::sync::Arc;

use tracing::{info, warn};

use crate::blockchain::{
    validate_address, validate_signature, validate_tx_hash,
    verify_transaction_ownership_by_signature, OwnershipError, RpcClient, RpcError,
    SignatureError,
};
use crate::clock::Clock;
use crate::hooks::{HookError, HookRegistry};
use crate::sessions::{
    SessionStatus, SessionStore, SessionType, StatusUpdate, StoreError, TransactionSession,
};

/// A client's report of a transaction it executed.
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub session_id: String,
    /// Session type as given in the URL
    pub session_type: String,
    pub transaction_hash: String,
    pub contract_address: Option<String>,
    pub status: SessionStatus,
    /// Personal-sign signature over [`confirmation_message`]
    pub signature: Option<String>,
}

/// Result of a successful confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmationOutcome {
    pub session: TransactionSession,
    /// Hook that applied the confirmation, if one ran
    pub hook: Option<&'static str>,
    /// Whether this was a retry of an earlier confirmation
    pub replayed: bool,
}

/// Confirmation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("unknown session type: {0}")]
    UnknownSessionType(String),

    #[error("session type mismatch: session is {actual}, request is for {requested}")]
    TypeMismatch {
        requested: SessionType,
        actual: SessionType,
    },

    #[error("status must be confirmed or failed, got {0}")]
    InvalidStatus(SessionStatus),

    #[error(transparent)]
    Validation(#[from] SignatureError),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session expired: {0}")]
    Expired(String),

    #[error("session is not pending (current status: {0})")]
    NotPending(SessionStatus),

    #[error("ownership proof required: include a signature of the confirmation message")]
    OwnershipProofRequired,

    #[error("signature does not match the transaction sender")]
    OwnershipMismatch,

    #[error("transaction not found on chain: {0}")]
    TransactionNotFound(String),

    #[error("ownership proof cannot be checked: no RPC endpoint configured")]
    RpcNotConfigured,

    #[error("RPC request failed: {0}")]
    Upstream(#[from] RpcError),

    #[error("session store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl From<StoreError> for ConfirmError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ConfirmError::NotFound(id),
            StoreError::NotPending(status) => ConfirmError::NotPending(status),
            StoreError::Expired(id) => ConfirmError::Expired(id),
            other => ConfirmError::Store(other),
        }
    }
}

impl From<OwnershipError> for ConfirmError {
    fn from(e: OwnershipError) -> Self {
        match e {
            OwnershipError::Signature(e) => ConfirmError::Validation(e),
            OwnershipError::TransactionNotFound(hash) => ConfirmError::TransactionNotFound(hash),
            OwnershipError::Rpc(e) => ConfirmError::Upstream(e),
        }
    }
}

/// Message a wallet signs to prove it sent the confirming transaction.
///
/// `tx_hash` is the lowercase `0x`-prefixed form.
pub fn confirmation_message(session_id: &str, tx_hash: &str) -> String {
    format!("Confirm session {session_id} with transaction {tx_hash}")
}

/// Validated form of a [`ConfirmationRequest`].
struct ValidReport {
    session_type: SessionType,
    status: SessionStatus,
    tx_hash: String,
    contract_address: Option<String>,
    signature: Option<String>,
}

/// Orchestrates session confirmation.
pub struct ConfirmationHandler {
    store: Arc<dyn SessionStore>,
    hooks: Arc<HookRegistry>,
    rpc: Option<Arc<RpcClient>>,
    clock: Arc<dyn Clock>,
    require_ownership_proof: bool,
}

impl ConfirmationHandler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        hooks: Arc<HookRegistry>,
        rpc: Option<Arc<RpcClient>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            hooks,
            rpc,
            clock,
            require_ownership_proof: false,
        }
    }

    pub fn with_required_ownership_proof(mut self, required: bool) -> Self {
        self.require_ownership_proof = required;
        self
    }

    /// Apply a confirmation report.
    pub async fn confirm(&self, request: ConfirmationRequest) -> Result<ConfirmationOutcome, ConfirmError> {
        let report = validate(&request)?;

        let session = self
            .store
            .get(&request.session_id)
            .await?
            .ok_or_else(|| ConfirmError::NotFound(request.session_id.clone()))?;

        if session.session_type != report.session_type {
            warn!(
                session_id = %session.id,
                requested = %report.session_type,
                actual = %session.session_type,
                "Confirmation rejected: session type mismatch"
            );
            return Err(ConfirmError::TypeMismatch {
                requested: report.session_type,
                actual: session.session_type,
            });
        }

        let now = self.clock.now();
        let replay = match session.status {
            SessionStatus::Pending if session.is_expired(now) => {
                return Err(ConfirmError::Expired(session.id));
            }
            SessionStatus::Pending => false,
            SessionStatus::Confirmed
                if report.status == SessionStatus::Confirmed
                    && session.transaction_hash.as_deref() == Some(report.tx_hash.as_str()) =>
            {
                true
            }
            other => return Err(ConfirmError::NotPending(other)),
        };

        self.check_ownership(&session.id, &report).await?;

        // The ownership round trip may outlive the session.
        let now = self.clock.now();
        if !replay && session.is_expired(now) {
            warn!(session_id = %session.id, "Session expired while checking ownership");
            return Err(ConfirmError::Expired(session.id));
        }

        let session = if replay {
            info!(
                session_id = %session.id,
                tx_hash = %report.tx_hash,
                "Repeated confirmation, dispatching hook again"
            );
            session
        } else {
            let updated = self
                .store
                .update_status(
                    &session.id,
                    StatusUpdate {
                        status: report.status,
                        transaction_hash: report.tx_hash.clone(),
                        contract_address: report.contract_address.clone(),
                    },
                    now,
                )
                .await?;
            info!(
                session_id = %updated.id,
                session_type = %updated.session_type,
                status = %updated.status,
                tx_hash = %report.tx_hash,
                "Session outcome recorded"
            );
            updated
        };

        let hook = if session.status == SessionStatus::Confirmed {
            match self.hooks.dispatch(&session).await {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        session_type = %session.session_type,
                        error = %e,
                        "Hook failed after status was recorded"
                    );
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        Ok(ConfirmationOutcome {
            session,
            hook,
            replayed: replay,
        })
    }

    async fn check_ownership(&self, session_id: &str, report: &ValidReport) -> Result<(), ConfirmError> {
        let signature = match (&report.signature, self.require_ownership_proof) {
            (Some(signature), _) => signature,
            (None, true) => return Err(ConfirmError::OwnershipProofRequired),
            (None, false) => return Ok(()),
        };
        let rpc = self.rpc.as_ref().ok_or(ConfirmError::RpcNotConfigured)?;

        let message = confirmation_message(session_id, &report.tx_hash);
        let owned =
            verify_transaction_ownership_by_signature(rpc, &report.tx_hash, signature, &message)
                .await?;

        if !owned {
            warn!(
                session_id = %session_id,
                tx_hash = %report.tx_hash,
                "Confirmation rejected: signature is not from the transaction sender"
            );
            return Err(ConfirmError::OwnershipMismatch);
        }
        Ok(())
    }
}

/// Local checks that need neither the store nor the network.
fn validate(request: &ConfirmationRequest) -> Result<ValidReport, ConfirmError> {
    let session_type = request
        .session_type
        .parse::<SessionType>()
        .map_err(|e| ConfirmError::UnknownSessionType(e.0))?;

    if !matches!(request.status, SessionStatus::Confirmed | SessionStatus::Failed) {
        return Err(ConfirmError::InvalidStatus(request.status));
    }

    let tx_hash = format!("{:#x}", validate_tx_hash(&request.transaction_hash)?);
    let contract_address = request
        .contract_address
        .as_deref()
        .map(|a| validate_address(a).map(|a| a.to_checksum(None)))
        .transpose()?;
    if let Some(signature) = &request.signature {
        validate_signature(signature)?;
    }

    Ok(ValidReport {
        session_type,
        status: request.status,
        tx_hash,
        contract_address,
        signature: request.signature.clone(),
    })
}
