//! Achievement and user stats endpoints

use super::error::ApiError;
use crate::achievements::AchievementEngine;
use crate::models::AchievementType;
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_achievements)
        .service(user_achievements)
        .service(user_stats)
        .service(check_achievements);
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(rename = "type")]
    pub achievement_type: Option<String>,
}

#[derive(Serialize)]
struct CheckResponse<'a> {
    message: &'static str,
    awarded: Vec<&'a str>,
}

#[get("/api/achievements")]
async fn list_achievements(
    engine: web::Data<AchievementEngine>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.all_achievements().await?))
}

#[get("/api/users/{wallet_address}/achievements")]
async fn user_achievements(
    engine: web::Data<AchievementEngine>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(engine.user_achievements(&path.into_inner()).await?))
}

#[get("/api/users/{wallet_address}/stats")]
async fn user_stats(
    engine: web::Data<AchievementEngine>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let stats = engine
        .user_stats(&path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("User stats not found".to_string()))?;
    Ok(HttpResponse::Ok().json(stats))
}

#[post("/api/users/{wallet_address}/achievements/check")]
async fn check_achievements(
    engine: web::Data<AchievementEngine>,
    path: web::Path<String>,
    payload: web::Json<CheckRequest>,
) -> Result<HttpResponse, ApiError> {
    let achievement_type: AchievementType = payload
        .achievement_type
        .as_deref()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid achievement type".to_string()))?;

    let report = engine
        .check_achievements(&path.into_inner(), achievement_type)
        .await?;

    Ok(HttpResponse::Ok().json(CheckResponse {
        message: "Achievement check triggered",
        awarded: report.awarded_titles(),
    }))
}
