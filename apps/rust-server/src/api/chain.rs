// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{blockchain::validate_address, error::ApiError, state::AppState};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Checksummed address
    pub address: String,
    /// Balance at the latest block, decimal wei
    pub balance_wei: String,
    /// Whether the address holds contract code
    pub is_contract: bool,
}

#[utoipa::path(
    get,
    path = "/v1/chain/accounts/{address}",
    params(
        ("address" = String, Path, description = "0x-prefixed EVM address")
    ),
    tag = "Chain",
    security(("bearer" = [])),
    responses(
        (status = 200, body = AccountInfo),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "RPC endpoint failure"),
        (status = 503, description = "No RPC endpoint configured")
    )
)]
pub async fn get_account(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountInfo>, ApiError> {
    let address = validate_address(&address)?;
    let rpc = state
        .rpc
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("RPC_URL is not configured"))?;

    let (balance, code) = tokio::try_join!(rpc.get_balance(address), rpc.get_code(address))?;

    Ok(Json(AccountInfo {
        address: address.to_checksum(None),
        balance_wei: balance.to_string(),
        is_contract: !code.is_empty(),
    }))
}
