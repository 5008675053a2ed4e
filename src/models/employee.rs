use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use crate::utils::validation::validate_not_blank;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Employee {
    pub employee_id: i64,
    pub name: String,
    pub email: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when an employee row is created or replaced.
#[derive(Debug, Clone)]
pub struct EmployeeFields {
    pub name: String,
    pub email: String,
}

/// Selection entry offered when assigning a driver to an employee.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmployeeOption {
    pub employee_id: i64,
    pub name: String,
}

impl From<&Employee> for EmployeeOption {
    fn from(employee: &Employee) -> Self {
        EmployeeOption {
            employee_id: employee.employee_id,
            name: employee.name.clone(),
        }
    }
}

/// Create/edit payload. The password is mandatory on create and, when
/// present on edit, resets the login password.
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct EmployeeInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: Option<String>,
}

impl EmployeeInput {
    pub fn fields(&self) -> EmployeeFields {
        EmployeeFields {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}
