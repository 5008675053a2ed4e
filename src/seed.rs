//! Demo data: one admin, four employees, ten drivers and twenty events
//! spread over the last twenty days.

use chrono::{Duration, Utc};
use log::info;
use rust_decimal::Decimal;

use crate::db::Store;
use crate::errors::AppError;
use crate::identity::{IdentityProvider, Role};
use crate::models::admin::AdminFields;
use crate::models::driver::DriverFields;
use crate::models::driving_event::EventFields;
use crate::models::employee::EmployeeFields;

pub const ADMIN_EMAIL: &str = "alice.admin@example.com";
pub const ADMIN_PASSWORD: &str = "AdminPassword123!";
pub const EMPLOYEE_PASSWORD: &str = "EmployeePassword123!";

const EMPLOYEES: [(&str, &str); 4] = [
    ("John Smith", "john.smith@example.com"),
    ("Emily Johnson", "emily.johnson@example.com"),
    ("Michael Brown", "michael.brown@example.com"),
    ("Sarah Williams", "sarah.williams@example.com"),
];

// (name, car registration, index into EMPLOYEES)
const DRIVERS: [(&str, &str, usize); 10] = [
    ("David Turner", "ABC123", 0),
    ("Sophia Carter", "XYZ456", 1),
    ("James Adams", "DEF789", 2),
    ("Olivia Evans", "GHI012", 0),
    ("Daniel Miller", "JKL345", 1),
    ("Amelia Thomas", "MNO678", 2),
    ("Christopher Harris", "PQR901", 3),
    ("Isabella Clark", "STU234", 0),
    ("Matthew Lewis", "VWX567", 1),
    ("Chloe King", "YZA890", 3),
];

// (index into DRIVERS, description, days ago, amount out, amount in)
const EVENTS: [(usize, &str, i64, i64, i64); 20] = [
    (0, "Fueling", 1, 50, 0),
    (0, "Car Wash", 2, 30, 0),
    (1, "Maintenance", 3, 200, 0),
    (1, "Fueling", 4, 60, 0),
    (2, "Car Wash", 5, 30, 0),
    (2, "Tire Replacement", 6, 150, 0),
    (3, "Fueling", 7, 55, 0),
    (4, "Accident Repair", 8, 1000, 0),
    (5, "Fueling", 9, 45, 0),
    (6, "Car Wash", 10, 25, 0),
    (0, "Delivery Service", 11, 0, 500),
    (1, "Customer Pickup", 12, 0, 300),
    (2, "Rental Income", 13, 0, 800),
    (3, "Transport Fee", 14, 0, 400),
    (4, "Maintenance & Service Income", 15, 150, 700),
    (5, "Cargo Transport", 16, 50, 900),
    (6, "Special Delivery Service", 17, 0, 1000),
    (7, "Customer Transport", 18, 20, 600),
    (8, "VIP Transport Service", 19, 30, 1200),
    (9, "Equipment Rental", 20, 10, 400),
];

async fn ensure_principal(identity: &dyn IdentityProvider, email: &str, password: &str, role: Role) -> Result<(), AppError> {
    if identity.find_principal(email).await?.is_none() {
        identity.create_principal(email, password, role).await?;
    }
    Ok(())
}

/// Loads the demo data unless employees already exist. Returns whether
/// anything was written.
pub async fn seed_demo_data(store: &dyn Store, identity: &dyn IdentityProvider) -> Result<bool, AppError> {
    if !store.list_employees().await?.is_empty() {
        info!("Store already holds employees; skipping demo data");
        return Ok(false);
    }

    ensure_principal(identity, ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin).await?;
    if store.find_admin_by_email(ADMIN_EMAIL).await?.is_none() {
        store
            .insert_admin(&AdminFields {
                name: "Alice Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
            })
            .await?;
    }

    let mut employee_ids = Vec::with_capacity(EMPLOYEES.len());
    for (name, email) in EMPLOYEES {
        ensure_principal(identity, email, EMPLOYEE_PASSWORD, Role::Employee).await?;
        let employee = store
            .insert_employee(&EmployeeFields {
                name: name.to_string(),
                email: email.to_string(),
            })
            .await?;
        employee_ids.push(employee.employee_id);
    }

    let mut driver_ids = Vec::with_capacity(DRIVERS.len());
    for (name, car_reg, owner) in DRIVERS {
        let driver = store
            .insert_driver(&DriverFields {
                driver_name: name.to_string(),
                car_reg: car_reg.to_string(),
                responsible_employee_id: employee_ids[owner],
            })
            .await?;
        driver_ids.push(driver.driver_id);
    }

    let now = Utc::now();
    for (driver, description, days_ago, out, inc) in EVENTS {
        store
            .insert_event(&EventFields {
                description: description.to_string(),
                event_date: now - Duration::days(days_ago),
                amount_out: Decimal::new(out, 0),
                amount_in: Decimal::new(inc, 0),
                driver_id: driver_ids[driver],
            })
            .await?;
    }

    info!(
        "Seeded demo data: {} employees, {} drivers, {} events",
        EMPLOYEES.len(),
        DRIVERS.len(),
        EVENTS.len()
    );
    Ok(true)
}
