//! Token claim endpoints

use super::error::{ApiError, ALREADY_CLAIMED, CAPACITY_REACHED};
use crate::achievements::AchievementEngine;
use crate::chain::TokenIssuer;
use crate::models::{Event, NewTokenClaim, TokenClaim};
use crate::store::{EventStore, SharedStore};
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(claim_token)
        .service(wallet_claims)
        .service(has_claimed);
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    #[validate(length(min = 1, message = "Event ID is required"))]
    pub event_id: String,
    #[validate(length(min = 1, message = "Wallet address is required"))]
    pub wallet_address: String,
    pub transaction_signature: Option<String>,
}

/// A claim with its event, as listed for a wallet.
#[derive(Serialize)]
struct ClaimWithEvent {
    #[serde(flatten)]
    claim: TokenClaim,
    event: Option<Event>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HasClaimedResponse {
    has_claimed: bool,
}

#[post("/api/claims")]
async fn claim_token(
    store: web::Data<SharedStore>,
    engine: web::Data<AchievementEngine>,
    issuer: web::Data<Arc<dyn TokenIssuer>>,
    payload: web::Json<ClaimRequest>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();

    let event = store
        .get_event(&req.event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    // Fast paths only; insert_claim enforces both for real.
    if store
        .has_wallet_claimed(&event.id, &req.wallet_address)
        .await?
    {
        return Err(ApiError::Conflict(ALREADY_CLAIMED.to_string()));
    }
    if let Some(max) = event.max_attendees {
        if store.count_claims_for_event(&event.id).await? >= u64::from(max) {
            return Err(ApiError::Conflict(CAPACITY_REACHED.to_string()));
        }
    }

    let transaction_signature = match req.transaction_signature.filter(|s| !s.is_empty()) {
        Some(signature) => signature,
        None => issuer
            .transfer_token(&event.token_mint_address, &req.wallet_address)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    };

    let claim = NewTokenClaim {
        event_id: event.id.clone(),
        wallet_address: req.wallet_address,
        transaction_signature,
    }
    .into_claim(Utc::now());
    let claim = store.insert_claim(claim, event.max_attendees).await?;

    if let Err(e) = engine
        .on_token_claimed(&claim.wallet_address, &claim.event_id)
        .await
    {
        log::warn!(
            "Achievement processing failed for claim of event {} by {}: {}",
            claim.event_id,
            claim.wallet_address,
            e
        );
    }

    Ok(HttpResponse::Created().json(claim))
}

#[get("/api/wallets/{address}/claims")]
async fn wallet_claims(
    store: web::Data<SharedStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let claims = store.list_claims_by_wallet(&path.into_inner()).await?;

    let mut events: HashMap<String, Option<Event>> = HashMap::new();
    let mut listed = Vec::with_capacity(claims.len());
    for claim in claims {
        if !events.contains_key(&claim.event_id) {
            let event = store.get_event(&claim.event_id).await?;
            events.insert(claim.event_id.clone(), event);
        }
        let event = events.get(&claim.event_id).cloned().flatten();
        listed.push(ClaimWithEvent { claim, event });
    }

    Ok(HttpResponse::Ok().json(listed))
}

#[get("/api/events/{event_id}/claims/{wallet_address}")]
async fn has_claimed(
    store: web::Data<SharedStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (event_id, wallet_address) = path.into_inner();
    let has_claimed = store.has_wallet_claimed(&event_id, &wallet_address).await?;
    Ok(HttpResponse::Ok().json(HasClaimedResponse { has_claimed }))
}
