// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum personal-sign verification.
//!
//! Wallets sign arbitrary text with the EIP-191 "personal message" scheme:
//! `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
//! This module recovers the signer of such a signature and proves that the
//! key behind an on-chain transaction also produced a given signature.
//!
//! All inputs are validated before any recovery or network access. Error
//! messages start with a stable prefix naming the offending field
//! (`invalid signature`, `invalid transaction hash`, `invalid address`).

use std::str::FromStr;

use alloy::primitives::{Address, Signature, B256, U256};

use super::rpc::{RpcClient, RpcError};

/// Length of a hex-encoded 65-byte signature, without the `0x` prefix.
const SIGNATURE_HEX_LEN: usize = 130;
/// Length of a hex-encoded 32-byte hash, without the `0x` prefix.
const TX_HASH_HEX_LEN: usize = 64;
/// Length of a hex-encoded 20-byte address, without the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

/// Input validation and recovery failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTransactionHash(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// Failures while proving transaction ownership.
#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Check that `value` is `0x` followed by exactly `expected` hex characters.
fn check_hex(value: &str, expected: usize) -> Result<&str, String> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| "must start with 0x".to_string())?;
    if digits.len() != expected {
        return Err(format!(
            "must be 0x followed by {expected} hex characters, got {}",
            digits.len()
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("must contain only hex characters".to_string());
    }
    Ok(digits)
}

/// Validate a `0x`-prefixed 65-byte signature and return its raw bytes.
pub fn validate_signature(signature: &str) -> Result<[u8; 65], SignatureError> {
    let digits = check_hex(signature, SIGNATURE_HEX_LEN).map_err(SignatureError::InvalidSignature)?;
    let mut bytes = [0u8; 65];
    alloy::hex::decode_to_slice(digits, &mut bytes)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    Ok(bytes)
}

/// Validate a `0x`-prefixed 32-byte transaction hash.
pub fn validate_tx_hash(tx_hash: &str) -> Result<B256, SignatureError> {
    check_hex(tx_hash, TX_HASH_HEX_LEN).map_err(SignatureError::InvalidTransactionHash)?;
    B256::from_str(tx_hash).map_err(|e| SignatureError::InvalidTransactionHash(e.to_string()))
}

/// Validate a `0x`-prefixed 20-byte address. Checksum casing is not enforced.
pub fn validate_address(address: &str) -> Result<Address, SignatureError> {
    check_hex(address, ADDRESS_HEX_LEN).map_err(SignatureError::InvalidAddress)?;
    Address::from_str(address).map_err(|e| SignatureError::InvalidAddress(e.to_string()))
}

/// Map the wallet recovery byte to a y-parity bit.
///
/// Wallets emit `v ∈ {27, 28}`; the secp256k1 recovery primitive expects
/// `{0, 1}`. Both forms are accepted.
fn normalize_recovery_id(v: u8) -> Result<bool, SignatureError> {
    match v {
        0 | 27 => Ok(false),
        1 | 28 => Ok(true),
        other => Err(SignatureError::InvalidSignature(format!(
            "recovery id must be 0/1 or 27/28, got {other}"
        ))),
    }
}

/// Recover the address that produced a personal-sign `signature` over `message`.
pub fn recover_personal_signer(message: &str, signature: &str) -> Result<Address, SignatureError> {
    let bytes = validate_signature(signature)?;
    let y_parity = normalize_recovery_id(bytes[64])?;
    let r = U256::from_be_slice(&bytes[..32]);
    let s = U256::from_be_slice(&bytes[32..64]);

    Signature::new(r, s, y_parity)
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SignatureError::Recovery(e.to_string()))
}

/// Verify that `signature` over `message` was produced by `claimed_address`.
///
/// A well-formed signature from a different key yields `Ok(false)`.
pub fn verify_personal_signature(
    message: &str,
    signature: &str,
    claimed_address: &str,
) -> Result<bool, SignatureError> {
    let claimed = validate_address(claimed_address)?;
    let recovered = recover_personal_signer(message, signature)?;
    Ok(recovered == claimed)
}

/// Prove that the sender of `tx_hash` also signed `message`.
///
/// The transaction's `from` is read through the RPC reader and compared with
/// the personal-sign signer. Inputs are validated before the RPC call.
pub async fn verify_transaction_ownership_by_signature(
    rpc: &RpcClient,
    tx_hash: &str,
    signature: &str,
    message: &str,
) -> Result<bool, OwnershipError> {
    let hash = validate_tx_hash(tx_hash)?;
    validate_signature(signature)?;

    let tx = rpc
        .get_transaction_by_hash(hash)
        .await?
        .ok_or_else(|| OwnershipError::TransactionNotFound(tx_hash.to_string()))?;

    let sender = tx.from.to_checksum(None);
    let owned = verify_personal_signature(message, signature, &sender)?;

    tracing::debug!(
        tx_hash = %hash,
        sender = %sender,
        owned,
        "Checked transaction ownership signature"
    );

    Ok(owned)
}
