//! Persistence store contract and its two backends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::admin::{Admin, AdminFields};
use crate::models::driver::{Driver, DriverFields, DriverFilter, DriverWithOwner};
use crate::models::driving_event::{DrivingEvent, EventDetail, EventFields, EventFilter};
use crate::models::employee::{Employee, EmployeeFields};

/// Durable storage. Deleting a driver removes its events; a referenced employee cannot be deleted.
#[async_trait]
pub trait Store: Send + Sync {
    // === Employees ===

    async fn list_employees(&self) -> Result<Vec<Employee>, AppError>;

    async fn get_employee(&self, id: i64) -> Result<Option<Employee>, AppError>;

    /// Case-insensitive lookup by login email.
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, AppError>;

    async fn insert_employee(&self, fields: &EmployeeFields) -> Result<Employee, AppError>;

    async fn update_employee(&self, id: i64, version: i32, fields: &EmployeeFields) -> Result<Employee, AppError>;

    async fn delete_employee(&self, id: i64) -> Result<(), AppError>;

    // === Admins ===

    async fn list_admins(&self) -> Result<Vec<Admin>, AppError>;

    async fn get_admin(&self, id: i64) -> Result<Option<Admin>, AppError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AppError>;

    async fn insert_admin(&self, fields: &AdminFields) -> Result<Admin, AppError>;

    async fn update_admin(&self, id: i64, version: i32, fields: &AdminFields) -> Result<Admin, AppError>;

    async fn delete_admin(&self, id: i64) -> Result<(), AppError>;

    // === Drivers ===

    async fn list_drivers(&self, filter: &DriverFilter) -> Result<Vec<DriverWithOwner>, AppError>;

    async fn get_driver(&self, id: i64) -> Result<Option<DriverWithOwner>, AppError>;

    async fn insert_driver(&self, fields: &DriverFields) -> Result<Driver, AppError>;

    async fn update_driver(&self, id: i64, version: i32, fields: &DriverFields) -> Result<Driver, AppError>;

    /// Cascades to the driver's events.
    async fn delete_driver(&self, id: i64) -> Result<(), AppError>;

    // === Driving events ===

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventDetail>, AppError>;

    async fn get_event(&self, id: i64) -> Result<Option<EventDetail>, AppError>;

    async fn insert_event(&self, fields: &EventFields) -> Result<DrivingEvent, AppError>;

    async fn update_event(&self, id: i64, version: i32, fields: &EventFields) -> Result<DrivingEvent, AppError>;

    async fn delete_event(&self, id: i64) -> Result<(), AppError>;
}

pub(crate) fn stale_version(kind: &str, id: i64) -> AppError {
    AppError::ConcurrencyConflict(format!(
        "{} {} was changed by someone else; reload it and try again",
        kind, id
    ))
}

pub(crate) fn missing(kind: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind, id))
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|err| {
            log::error!("Failed to connect to the database: {:?}", err);
            AppError::DatabaseError(err.to_string())
        })
}
