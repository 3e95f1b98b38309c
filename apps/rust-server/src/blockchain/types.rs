// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types shared by the RPC reader and the signature verifier.

use alloy::primitives::{Address, B256, U256};

/// Transaction metadata read via `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcTransaction {
    pub hash: B256,
    /// Sender recovered by the node
    pub from: Address,
    /// Recipient (None for contract creation)
    pub to: Option<Address>,
    /// Block number (None while pending)
    pub block_number: Option<u64>,
    pub nonce: u64,
    /// Value in wei
    pub value: U256,
}
