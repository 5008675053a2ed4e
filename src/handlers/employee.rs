use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::employee::EmployeeInput;
use crate::models::Versioned;
use crate::services::employees;
use crate::state::AppState;

pub async fn get_employees(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
    let employees = employees::list_employees(state.store(), &principal).await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employee(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee = employees::get_employee(state.store(), &principal, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn create_employee(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<EmployeeInput>,
) -> Result<HttpResponse, AppError> {
    let employee = employees::create_employee(state.store(), state.identity(), &principal, &body).await?;
    Ok(HttpResponse::Created().json(employee))
}

pub async fn update_employee(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    body: web::Json<Versioned<EmployeeInput>>,
) -> Result<HttpResponse, AppError> {
    let employee = employees::update_employee(
        state.store(),
        state.identity(),
        &principal,
        id.into_inner(),
        body.version,
        &body.fields,
    )
    .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee(
    state: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    employees::delete_employee(state.store(), state.identity(), &principal, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}
