// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain reader over an alloy HTTP provider.
//!
//! Every call is bounded by the client timeout and is cancelled when the
//! calling future is dropped.

use std::future::IntoFuture;
use std::time::Duration;

use alloy::{
    consensus::Transaction as _,
    network::{Ethereum, TransactionResponse},
    primitives::{Address, Bytes, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    transports::{TransportError, TransportErrorKind},
};

use super::types::RpcTransaction;

/// Default timeout for a single RPC round trip.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP provider type (with the default fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors that can occur while talking to the RPC endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC request timed out after {0:?}")]
    Timeout(Duration),

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::ErrorResp(payload) => RpcError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            TransportError::Transport(TransportErrorKind::HttpError(http)) => {
                RpcError::HttpStatus(http.status)
            }
            err @ (TransportError::DeserError { .. } | TransportError::NullResp) => {
                RpcError::Decode(err.to_string())
            }
            other => RpcError::Transport(other.to_string()),
        }
    }
}

/// Read-only client for a single EVM endpoint.
pub struct RpcClient {
    provider: HttpProvider,
    timeout: Duration,
}

impl RpcClient {
    /// Create a client with the default timeout.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(rpc_url, DEFAULT_RPC_TIMEOUT)
    }

    /// Create a client whose calls are bounded by `timeout`.
    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let rpc_url: String = rpc_url.into();
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| RpcError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self { provider, timeout })
    }

    async fn bounded<F, T>(&self, call: F) -> Result<T, RpcError>
    where
        F: IntoFuture<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))?
            .map_err(RpcError::from)
    }

    /// `eth_getTransactionByHash`. Returns `None` for unknown transactions.
    pub async fn get_transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        let tx = self
            .bounded(self.provider.get_transaction_by_hash(tx_hash))
            .await?;

        let Some(tx) = tx else {
            tracing::debug!(tx_hash = %tx_hash, "Transaction not found");
            return Ok(None);
        };

        Ok(Some(RpcTransaction {
            hash: tx.tx_hash(),
            from: TransactionResponse::from(&tx),
            to: tx.to(),
            block_number: tx.block_number,
            nonce: tx.nonce(),
            value: tx.value(),
        }))
    }

    /// `eth_getBalance` at the latest block, in wei.
    pub async fn get_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.bounded(self.provider.get_balance(address)).await
    }

    /// `eth_getCode` at the latest block. Empty for externally owned accounts.
    pub async fn get_code(&self, address: Address) -> Result<Bytes, RpcError> {
        self.bounded(self.provider.get_code_at(address)).await
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.bounded(self.provider.get_chain_id()).await
    }
}
