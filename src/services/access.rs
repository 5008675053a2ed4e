//! Role-scoped record access: admins see everything, employees their own drivers.

use log::warn;

use crate::db::Store;
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::employee::Employee;

#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    All,
    Employee(Employee),
}

impl Scope {
    pub fn employee_id(&self) -> Option<i64> {
        match self {
            Scope::All => None,
            Scope::Employee(employee) => Some(employee.employee_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Scope::All)
    }

    pub fn owns(&self, responsible_employee_id: i64) -> bool {
        match self {
            Scope::All => true,
            Scope::Employee(employee) => employee.employee_id == responsible_employee_id,
        }
    }

    pub fn ensure_owns(&self, responsible_employee_id: i64, what: &str) -> Result<(), AppError> {
        if self.owns(responsible_employee_id) {
            Ok(())
        } else {
            Err(forbidden(what))
        }
    }
}

pub fn forbidden(what: &str) -> AppError {
    AppError::Forbidden(format!("You are not allowed to access this {}", what))
}

/// An employee login without an employee row gets `NotFound`.
pub async fn resolve_scope(store: &dyn Store, principal: &Principal) -> Result<Scope, AppError> {
    if principal.is_admin() {
        return Ok(Scope::All);
    }
    if !principal.is_employee() {
        warn!("Principal {} has no role; denying access", principal.email);
        return Err(AppError::Forbidden("No role assigned to this login".to_string()));
    }
    match store.find_employee_by_email(&principal.email).await? {
        Some(employee) => Ok(Scope::Employee(employee)),
        None => {
            warn!("Principal {} has no employee record", principal.email);
            Err(AppError::NotFound("No employee record for this login".to_string()))
        }
    }
}

pub fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.is_admin() {
        Ok(())
    } else {
        warn!("Principal {} attempted an admin-only operation", principal.email);
        Err(AppError::Forbidden("Administrator role required".to_string()))
    }
}
