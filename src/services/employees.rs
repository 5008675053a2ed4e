use log::{error, info, warn};

use crate::db::{stale_version, Store};
use crate::errors::AppError;
use crate::identity::{IdentityProvider, Principal, Role};
use crate::models::driver::DriverFilter;
use crate::models::employee::{Employee, EmployeeInput};
use crate::services::access::{forbidden, require_admin, resolve_scope, Scope};
use crate::services::accounts;
use crate::utils::validation::validate_payload;

/// Admins list everyone; an employee gets a list holding only their own record.
pub async fn list_employees(store: &dyn Store, principal: &Principal) -> Result<Vec<Employee>, AppError> {
    match resolve_scope(store, principal).await? {
        Scope::All => store.list_employees().await,
        Scope::Employee(own) => Ok(vec![own]),
    }
}

pub async fn get_employee(store: &dyn Store, principal: &Principal, id: i64) -> Result<Employee, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let employee = store
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;
    scope.ensure_owns(employee.employee_id, "employee")?;
    Ok(employee)
}

pub async fn create_employee(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    input: &EmployeeInput,
) -> Result<Employee, AppError> {
    require_admin(principal)?;
    validate_payload(input)?;
    let password = accounts::required_password(input.password.as_deref())?;
    let fields = input.fields();

    if store.find_employee_by_email(&fields.email).await?.is_some() {
        return Err(AppError::Conflict(format!("Employee with email '{}' already exists", fields.email)));
    }

    identity.create_principal(&fields.email, password, Role::Employee).await?;

    match store.insert_employee(&fields).await {
        Ok(employee) => {
            info!("Employee {} ({}) created by {}", employee.employee_id, employee.email, principal.email);
            Ok(employee)
        }
        Err(err) => Err(accounts::discard_principal(identity, &fields.email, err).await),
    }
}

pub async fn update_employee(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    id: i64,
    version: i32,
    input: &EmployeeInput,
) -> Result<Employee, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let current = store
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;
    if !scope.owns(current.employee_id) {
        warn!("{} attempted to edit employee {}", principal.email, id);
        return Err(forbidden("employee"));
    }

    validate_payload(input)?;
    accounts::check_optional_password(input.password.as_deref())?;
    if current.version != version {
        return Err(stale_version("Employee", id));
    }
    let fields = input.fields();

    let updated = accounts::update_with_login(identity, &current.email, &fields.email, || {
        store.update_employee(id, version, &fields)
    })
    .await?;

    if let Some(password) = input.password.as_deref().filter(|p| !p.is_empty()) {
        identity.reset_password(&updated.email, password).await.map_err(|err| {
            error!("Employee {} saved but password reset failed: {}", id, err);
            err
        })?;
    }

    info!("Employee {} updated by {}", id, principal.email);
    Ok(updated)
}

pub async fn delete_employee(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    id: i64,
) -> Result<(), AppError> {
    require_admin(principal)?;
    let employee = store
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

    let owned = store
        .list_drivers(&DriverFilter {
            responsible_employee_id: Some(id),
            search: None,
        })
        .await?;
    if !owned.is_empty() {
        return Err(AppError::ReferentialIntegrity(format!(
            "Employee {} is still responsible for {} driver(s); reassign them first",
            id,
            owned.len()
        )));
    }

    accounts::delete_with_login(identity, &employee.email, || store.delete_employee(id)).await?;
    info!("Employee {} ({}) deleted by {}", id, employee.email, principal.email);
    Ok(())
}
