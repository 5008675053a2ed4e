use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driving_event::HistoryQuery;
use crate::services::reports;
use crate::state::AppState;

pub async fn get_notifications(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(reports::notifications(state.store(), &principal, Utc::now()).await?))
}

pub async fn get_history(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(reports::history(state.store(), &principal, &query).await?))
}

pub async fn get_recent_activity(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(reports::recent_activity(state.store(), &principal, Utc::now()).await?))
}
