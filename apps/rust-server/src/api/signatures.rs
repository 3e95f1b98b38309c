// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use alloy::primitives::Address;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    blockchain::{
        recover_personal_signer, validate_address, validate_signature, validate_tx_hash,
        verify_transaction_ownership_by_signature,
    },
    confirmation::ConfirmError,
    error::{ApiError, ApiJson},
    state::AppState,
};

/// Body of `POST /v1/signatures/verify`.
///
/// Exactly one of `address` and `transactionHash` names the expected signer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest {
    /// Message that was personal-signed
    pub message: String,
    /// 65-byte `0x`-prefixed signature
    pub signature: String,
    /// Claimed signer
    #[serde(default)]
    pub address: Option<String>,
    /// Transaction whose sender is the claimed signer
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureResponse {
    pub valid: bool,
    /// Checksummed address recovered from the signature
    pub signer: String,
}

enum ExpectedSigner<'a> {
    Address(Address),
    SenderOf(&'a str),
}

#[utoipa::path(
    post,
    path = "/v1/signatures/verify",
    request_body = VerifySignatureRequest,
    tag = "Signatures",
    security(("bearer" = [])),
    responses(
        (status = 200, body = VerifySignatureResponse),
        (status = 400, description = "Malformed signature, address or hash"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 422, description = "Transaction not found on chain"),
        (status = 503, description = "No RPC endpoint configured")
    )
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifySignatureRequest>,
) -> Result<Json<VerifySignatureResponse>, ApiError> {
    validate_signature(&request.signature)?;
    let expected = match (&request.address, &request.transaction_hash) {
        (Some(address), None) => ExpectedSigner::Address(validate_address(address)?),
        (None, Some(tx_hash)) => {
            validate_tx_hash(tx_hash)?;
            ExpectedSigner::SenderOf(tx_hash.as_str())
        }
        _ => {
            return Err(ApiError::bad_request(
                "provide exactly one of address or transactionHash",
            ))
        }
    };

    let signer = recover_personal_signer(&request.message, &request.signature)?;

    let valid = match expected {
        ExpectedSigner::Address(address) => address == signer,
        ExpectedSigner::SenderOf(tx_hash) => {
            let rpc = state
                .rpc
                .as_ref()
                .ok_or_else(|| ApiError::service_unavailable("RPC_URL is not configured"))?;
            verify_transaction_ownership_by_signature(
                rpc,
                tx_hash,
                &request.signature,
                &request.message,
            )
            .await
            .map_err(ConfirmError::from)?
        }
    };

    Ok(Json(VerifySignatureResponse {
        valid,
        signer: signer.to_checksum(None),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::rpc::fixtures::{mined_transaction, rpc_result};
    use crate::blockchain::RpcClient;
    use crate::state::test_state;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer};

    const KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const TX_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
    const MESSAGE: &str = "hello relayer";

    fn sign(message: &str) -> String {
        let signer: PrivateKeySigner = KEY_0.parse().unwrap();
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
        format!("0x{}", alloy::hex::encode(signature.as_bytes()))
    }

    fn request(address: Option<&str>, tx_hash: Option<&str>) -> VerifySignatureRequest {
        VerifySignatureRequest {
            message: MESSAGE.to_string(),
            signature: sign(MESSAGE),
            address: address.map(str::to_string),
            transaction_hash: tx_hash.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn verifies_against_claimed_address() {
        let Json(ok) = verify_signature(State(test_state()), ApiJson(request(Some(ADDRESS_0), None)))
            .await
            .unwrap();
        assert!(ok.valid);
        assert_eq!(ok.signer, ADDRESS_0);

        let Json(other) = verify_signature(State(test_state()), ApiJson(request(Some(ADDRESS_1), None)))
            .await
            .unwrap();
        assert!(!other.valid);
        assert_eq!(other.signer, ADDRESS_0);
    }

    #[tokio::test]
    async fn requires_exactly_one_expected_signer() {
        let neither = verify_signature(State(test_state()), ApiJson(request(None, None)))
            .await
            .unwrap_err();
        assert_eq!(neither.status, StatusCode::BAD_REQUEST);

        let both = verify_signature(
            State(test_state()),
            ApiJson(request(Some(ADDRESS_0), Some(TX_HASH))),
        )
        .await
        .unwrap_err();
        assert_eq!(both.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_signature_is_bad_request() {
        let mut bad = request(Some(ADDRESS_0), None);
        bad.signature = "0x1234".to_string();

        let err = verify_signature(State(test_state()), ApiJson(bad))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn claimed_signer_is_validated_before_recovery() {
        // Well-formed hex whose recovery byte no wallet emits.
        let unrecoverable = format!("0x{}05", "11".repeat(64));

        let mut bad_address = request(Some("0x1234"), None);
        bad_address.signature = unrecoverable.clone();
        let err = verify_signature(State(test_state()), ApiJson(bad_address))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("invalid address"), "{}", err.message);

        let mut bad_hash = request(None, Some("0xabcd"));
        bad_hash.signature = unrecoverable;
        let err = verify_signature(State(test_state()), ApiJson(bad_hash))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("invalid transaction hash"), "{}", err.message);
    }

    #[tokio::test]
    async fn transaction_check_needs_rpc() {
        let err = verify_signature(State(test_state()), ApiJson(request(None, Some(TX_HASH))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn verifies_against_transaction_sender() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_getTransactionByHash"})))
            .respond_with(rpc_result(mined_transaction(TX_HASH, ADDRESS_0, Some(ADDRESS_1))))
            .mount(&server)
            .await;

        let state = test_state().with_rpc(Some(Arc::new(RpcClient::new(server.uri()).unwrap())));
        let Json(response) = verify_signature(State(state), ApiJson(request(None, Some(TX_HASH))))
            .await
            .unwrap();
        assert!(response.valid);
    }
}
