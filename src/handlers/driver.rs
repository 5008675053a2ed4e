use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driver::DriverInput;
use crate::models::driving_event::DateRange;
use crate::models::Versioned;
use crate::services::drivers;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DriverQueryParams {
    search: Option<String>,
}

pub async fn get_drivers(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<DriverQueryParams>,
) -> Result<HttpResponse, AppError> {
    let drivers = drivers::list_drivers(state.store(), &principal, query.search.as_deref()).await?;
    Ok(HttpResponse::Ok().json(drivers))
}

pub async fn get_driver(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    range: web::Query<DateRange>,
) -> Result<HttpResponse, AppError> {
    let details = drivers::get_driver_details(state.store(), &principal, id.into_inner(), range.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn get_driver_options(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(drivers::driver_form_options(state.store(), &principal).await?))
}

pub async fn create_driver(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<DriverInput>,
) -> Result<HttpResponse, AppError> {
    let driver = drivers::create_driver(state.store(), &principal, &body).await?;
    Ok(HttpResponse::Created().json(driver))
}

pub async fn update_driver(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    body: web::Json<Versioned<DriverInput>>,
) -> Result<HttpResponse, AppError> {
    let driver = drivers::update_driver(state.store(), &principal, id.into_inner(), body.version, &body.fields).await?;
    Ok(HttpResponse::Ok().json(driver))
}

pub async fn delete_driver(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    drivers::delete_driver(state.store(), &principal, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Driver deleted successfully",
    })))
}
