use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use validator::Validate;
use crate::models::driver::DriverOption;
use crate::utils::validation::{validate_amount, validate_not_blank};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DrivingEvent {
    pub event_id: i64,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub amount_out: Decimal,
    pub amount_in: Decimal,
    pub driver_id: i64,
    pub version: i32,
}

/// An event joined with its driver and the driver's responsible employee.
/// This is also the notification row.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct EventDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: DrivingEvent,
    pub driver_name: String,
    pub car_reg: String,
    pub responsible_employee_id: i64,
    pub responsible_employee_name: String,
}

#[derive(Debug, Clone)]
pub struct EventFields {
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub amount_out: Decimal,
    pub amount_in: Decimal,
    pub driver_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub responsible_employee_id: Option<i64>,
    pub driver_id: Option<i64>,
    /// Inclusive lower bound on the event date.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event date.
    pub to: Option<DateTime<Utc>>,
    pub driver_name: Option<String>,
    pub employee_name: Option<String>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct DrivingEventInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub description: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub amount_out: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub amount_in: Decimal,
    pub driver_id: i64,
}

impl DrivingEventInput {
    pub fn fields(&self) -> EventFields {
        EventFields {
            description: self.description.trim().to_string(),
            event_date: self.event_date,
            amount_out: self.amount_out,
            amount_in: self.amount_in,
            driver_id: self.driver_id,
        }
    }
}

/// Choices for the driver field of an event form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventFormOptions {
    pub drivers: Vec<DriverOption>,
}

/// Optional inclusive date bounds taken from the query string.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HistoryQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub driver_name: Option<String>,
    pub employee_name: Option<String>,
}
