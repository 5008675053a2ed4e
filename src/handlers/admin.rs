use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::admin::AdminInput;
use crate::models::Versioned;
use crate::services::admins;
use crate::state::AppState;

pub async fn get_admins(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(admins::list_admins(state.store(), &principal).await?))
}

pub async fn get_admin(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(admins::get_admin(state.store(), &principal, id.into_inner()).await?))
}

pub async fn create_admin(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<AdminInput>,
) -> Result<HttpResponse, AppError> {
    let admin = admins::create_admin(state.store(), state.identity(), &principal, &body).await?;
    Ok(HttpResponse::Created().json(admin))
}

pub async fn update_admin(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    body: web::Json<Versioned<AdminInput>>,
) -> Result<HttpResponse, AppError> {
    let admin = admins::update_admin(
        state.store(),
        state.identity(),
        &principal,
        id.into_inner(),
        body.version,
        &body.fields,
    )
    .await?;
    Ok(HttpResponse::Ok().json(admin))
}

pub async fn delete_admin(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    admins::delete_admin(state.store(), state.identity(), &principal, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Admin deleted successfully",
    })))
}
