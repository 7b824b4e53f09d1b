//! Token metadata and ownership endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::TokenId;
use order_store::OrderStore;
use pipeline::NftMetadata;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct OwnerResponse {
    pub token_id: String,
    pub owner: String,
}

/// GET /nft/metadata/:token_id — serve the published metadata document.
#[tracing::instrument(skip(state))]
pub async fn metadata<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token_id): Path<String>,
) -> Result<Json<NftMetadata>, ApiError> {
    let token_id = parse_token_id(&token_id)?;
    let document = state
        .orchestrator
        .issuance()
        .metadata_for(token_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no metadata for token {token_id}")))?;

    Ok(Json(document))
}

/// GET /nft/owner/:token_id — report the chain-side owner of a token.
#[tracing::instrument(skip(state))]
pub async fn owner<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token_id): Path<String>,
) -> Result<Json<OwnerResponse>, ApiError> {
    let token_id = parse_token_id(&token_id)?;
    let owner = state
        .orchestrator
        .issuance()
        .verify_owner(token_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("token {token_id} is not on chain")))?;

    Ok(Json(OwnerResponse {
        token_id: token_id.to_string(),
        owner,
    }))
}

fn parse_token_id(id: &str) -> Result<TokenId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid token id: {e}")))?;
    Ok(TokenId::from_uuid(uuid))
}
