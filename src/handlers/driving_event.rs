use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driving_event::{DateRange, DrivingEventInput};
use crate::models::Versioned;
use crate::services::driving_events;
use crate::state::AppState;

pub async fn get_events(
    state: web::Data<AppState>,
    principal: Principal,
    range: web::Query<DateRange>,
) -> Result<HttpResponse, AppError> {
    let events = driving_events::list_events(state.store(), &principal, range.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

pub async fn get_event(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(driving_events::get_event(state.store(), &principal, id.into_inner()).await?))
}

pub async fn get_event_options(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(driving_events::event_form_options(state.store(), &principal).await?))
}

pub async fn create_event(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<DrivingEventInput>,
) -> Result<HttpResponse, AppError> {
    let event = driving_events::create_event(state.store(), &principal, &body).await?;
    Ok(HttpResponse::Created().json(event))
}

pub async fn update_event(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    body: web::Json<Versioned<DrivingEventInput>>,
) -> Result<HttpResponse, AppError> {
    let event =
        driving_events::update_event(state.store(), &principal, id.into_inner(), body.version, &body.fields).await?;
    Ok(HttpResponse::Ok().json(event))
}

pub async fn delete_event(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    driving_events::delete_event(state.store(), &principal, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Driving event deleted successfully",
    })))
}
