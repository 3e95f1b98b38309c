// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain access.
//!
//! This module provides:
//! - A JSON-RPC reader for transaction metadata, balances and code
//! - Personal-sign signature recovery and transaction ownership proofs

pub mod rpc;
pub mod signature;
pub mod types;

pub use rpc::{RpcClient, RpcError};
pub use signature::{
    recover_personal_signer, validate_address, validate_signature,
    validate_tx_hash, verify_personal_signature, verify_transaction_ownership_by_signature,
    OwnershipError, SignatureError,
};
pub use types::RpcTransaction;
