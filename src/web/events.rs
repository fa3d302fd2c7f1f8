//! Event endpoints

use super::error::ApiError;
use crate::achievements::AchievementEngine;
use crate::chain::{qr_code_payload, TokenIssuer};
use crate::models::NewEvent;
use crate::store::{EventStore, SharedStore};
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_events)
        .service(create_event)
        .service(view_event)
        .service(creator_events);
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "Event name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, message = "Creator wallet address is required"))]
    pub creator: String,
    pub token_mint_address: Option<String>,
    pub qr_code_data: Option<String>,
    #[validate(range(min = 1, message = "Maximum attendees must be at least 1"))]
    pub max_attendees: Option<u32>,
    pub image_url: Option<String>,
}

#[get("/api/events")]
async fn list_events(store: web::Data<SharedStore>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(store.list_events().await?))
}

#[get("/api/events/{id}")]
async fn view_event(
    store: web::Data<SharedStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let event = store
        .get_event(&path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;
    Ok(HttpResponse::Ok().json(event))
}

#[get("/api/creators/{address}/events")]
async fn creator_events(
    store: web::Data<SharedStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(store.list_events_by_creator(&path.into_inner()).await?))
}

#[post("/api/events")]
async fn create_event(
    store: web::Data<SharedStore>,
    engine: web::Data<AchievementEngine>,
    issuer: web::Data<Arc<dyn TokenIssuer>>,
    payload: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let req = payload.into_inner();

    let token_mint_address = match req.token_mint_address.filter(|s| !s.is_empty()) {
        Some(address) => address,
        None => {
            issuer
                .mint_event_token(&req.name)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?
                .mint_address
        }
    };

    let new_event = NewEvent {
        name: req.name,
        description: req.description,
        date: req.date,
        creator: req.creator,
        token_mint_address,
        qr_code_data: req
            .qr_code_data
            .filter(|s| !s.is_empty())
            .unwrap_or_else(qr_code_payload),
        max_attendees: req.max_attendees,
        image_url: req.image_url,
    };
    let event = store.insert_event(new_event.into_event(Utc::now())).await?;

    // The event exists regardless of what the engine does.
    if let Err(e) = engine.on_event_created(&event.creator).await {
        log::warn!(
            "Achievement processing failed for creator {} of event {}: {}",
            event.creator,
            event.id,
            e
        );
    }

    Ok(HttpResponse::Created().json(event))
}
