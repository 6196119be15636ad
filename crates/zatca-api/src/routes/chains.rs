//! # Hash-Chain API
//!
//! Read and seed the per-seller invoice chain.
//!
//! - **GET `/v1/zatca/chains/{seller_id}`**: current head and next counter
//! - **PUT `/v1/zatca/chains/{seller_id}`**: load persisted state, e.g. after a restart
//!
//! The chain itself is owned by the invoice store outside this service;
//! PUT is how that store hands the last recorded head back.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zatca_core::digest::is_base64;
use zatca_core::ChainState;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{seller_key, AppState};

/// Chain head for one seller.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainResponse {
    /// Seller identifier.
    pub seller_id: String,
    /// Counter of the last recorded invoice (0 when none).
    pub last_counter_value: u64,
    /// Hash of the last recorded invoice, or the genesis hash.
    pub last_hash: String,
    /// Counter the next invoice must carry.
    pub next_counter_value: u64,
}

impl ChainResponse {
    fn new(seller_id: String, state: ChainState) -> Self {
        Self {
            seller_id,
            next_counter_value: state.last_counter_value + 1,
            last_counter_value: state.last_counter_value,
            last_hash: state.last_hash,
        }
    }
}

/// Persisted chain head to load.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadChainRequest {
    /// Counter of the last recorded invoice.
    pub last_counter_value: u64,
    /// Hash of the last recorded invoice.
    pub last_hash: String,
}

impl Validate for LoadChainRequest {
    fn validate(&self) -> Result<(), String> {
        if !is_base64(self.last_hash.trim()) {
            return Err(format!("lastHash must be Base64, got \"{}\"", self.last_hash));
        }
        Ok(())
    }
}

/// Build the chains router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/zatca/chains/{seller_id}", get(get_chain).put(load_chain))
}

/// GET /v1/zatca/chains/{seller_id}: Current chain head.
#[utoipa::path(
    get,
    path = "/v1/zatca/chains/{seller_id}",
    params(("seller_id" = String, Path, description = "Seller identifier")),
    responses(
        (status = 200, description = "Chain head", body = ChainResponse),
        (status = 422, description = "Blank seller identifier", body = crate::error::ErrorBody),
    ),
    tag = "chains"
)]
pub async fn get_chain(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<ChainResponse>, AppError> {
    let seller_id = seller_key(&seller_id)?;
    let head = state.chains.state(&seller_id);
    Ok(Json(ChainResponse::new(seller_id, head)))
}

/// PUT /v1/zatca/chains/{seller_id}: Load a persisted chain head.
#[utoipa::path(
    put,
    path = "/v1/zatca/chains/{seller_id}",
    params(("seller_id" = String, Path, description = "Seller identifier")),
    request_body = LoadChainRequest,
    responses(
        (status = 200, description = "Chain head loaded", body = ChainResponse),
        (status = 422, description = "Hash is not Base64 or seller identifier is blank", body = crate::error::ErrorBody),
    ),
    tag = "chains"
)]
pub async fn load_chain(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
    body: Result<Json<LoadChainRequest>, JsonRejection>,
) -> Result<Json<ChainResponse>, AppError> {
    let seller_id = seller_key(&seller_id)?;
    let req = extract_validated_json(body)?;
    let _guard = state.lock_seller(&seller_id).await;

    let head = ChainState {
        last_counter_value: req.last_counter_value,
        last_hash: req.last_hash.trim().to_string(),
    };
    state.chains.load(&seller_id, head.clone());
    tracing::info!(
        seller_id = %seller_id,
        counter = head.last_counter_value,
        "chain head loaded"
    );
    Ok(Json(ChainResponse::new(seller_id, head)))
}
