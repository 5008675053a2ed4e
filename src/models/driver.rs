use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use validator::Validate;
use crate::models::employee::EmployeeOption;
use crate::utils::validation::validate_not_blank;
use crate::models::driving_event::{DrivingEvent, EventDetail};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Driver {
    pub driver_id: i64,
    pub driver_name: String,
    pub car_reg: String,
    pub responsible_employee_id: i64,
    pub version: i32,
}

/// A driver joined with the name of its responsible employee.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct DriverWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub driver: Driver,
    pub responsible_employee_name: String,
}

#[derive(Debug, Clone)]
pub struct DriverFields {
    pub driver_name: String,
    pub car_reg: String,
    pub responsible_employee_id: i64,
}

/// Query narrowing for driver listings. `None` means "no restriction".
#[derive(Debug, Clone, Default)]
pub struct DriverFilter {
    pub responsible_employee_id: Option<i64>,
    /// Case-insensitive substring of the name or the car registration.
    pub search: Option<String>,
}

/// Sums over all events of a driver. Never stored.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverTotals {
    pub total_amount_out: Decimal,
    pub total_amount_in: Decimal,
}

impl DriverTotals {
    pub fn add(&mut self, event: &DrivingEvent) {
        self.total_amount_out += event.amount_out;
        self.total_amount_in += event.amount_in;
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DriverSummary {
    #[serde(flatten)]
    pub driver: DriverWithOwner,
    #[serde(flatten)]
    pub totals: DriverTotals,
}

#[derive(Serialize, Debug, Clone)]
pub struct DriverDetails {
    #[serde(flatten)]
    pub summary: DriverSummary,
    pub events: Vec<EventDetail>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DriverOption {
    pub driver_id: i64,
    pub driver_name: String,
}

impl From<&DriverWithOwner> for DriverOption {
    fn from(row: &DriverWithOwner) -> Self {
        DriverOption {
            driver_id: row.driver.driver_id,
            driver_name: row.driver.driver_name.clone(),
        }
    }
}

/// Create/edit payload. `responsible_employee_id` is honoured for admins
/// only; employees always own the drivers they create or edit.
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct DriverInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub driver_name: String,
    #[validate(length(min = 1, max = 10), custom = "validate_not_blank")]
    pub car_reg: String,
    pub responsible_employee_id: Option<i64>,
}

/// Choices for the responsible-employee field of a driver form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DriverFormOptions {
    pub employees: Vec<EmployeeOption>,
}
