use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{missing, stale_version, Store};
use crate::identity::email_key;
use crate::errors::AppError;
use crate::models::admin::{Admin, AdminFields};
use crate::models::driver::{Driver, DriverFields, DriverFilter, DriverWithOwner};
use crate::models::driving_event::{DrivingEvent, EventDetail, EventFields, EventFilter};
use crate::models::employee::{Employee, EmployeeFields};
use crate::utils::validation::contains_ignore_case;

#[derive(Default)]
struct Tables {
    employees: BTreeMap<i64, Employee>,
    admins: BTreeMap<i64, Admin>,
    drivers: BTreeMap<i64, Driver>,
    events: BTreeMap<i64, DrivingEvent>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn driver_with_owner(&self, driver: &Driver) -> Result<DriverWithOwner, AppError> {
        let owner = self
            .employees
            .get(&driver.responsible_employee_id)
            .ok_or_else(|| AppError::InternalServerError(format!(
                "Driver {} references missing employee {}",
                driver.driver_id, driver.responsible_employee_id
            )))?;
        Ok(DriverWithOwner {
            driver: driver.clone(),
            responsible_employee_name: owner.name.clone(),
        })
    }

    fn event_detail(&self, event: &DrivingEvent) -> Result<EventDetail, AppError> {
        let driver = self
            .drivers
            .get(&event.driver_id)
            .ok_or_else(|| AppError::InternalServerError(format!(
                "Event {} references missing driver {}",
                event.event_id, event.driver_id
            )))?;
        let owned = self.driver_with_owner(driver)?;
        Ok(EventDetail {
            event: event.clone(),
            driver_name: owned.driver.driver_name,
            car_reg: owned.driver.car_reg,
            responsible_employee_id: owned.driver.responsible_employee_id,
            responsible_employee_name: owned.responsible_employee_name,
        })
    }

    fn email_taken<'a, I>(mut emails: I, email: &str, except: Option<i64>) -> bool
    where
        I: Iterator<Item = (i64, &'a str)>,
    {
        let key = email_key(email);
        emails.any(|(id, existing)| Some(id) != except && email_key(existing) == key)
    }

    fn employee_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        Self::email_taken(
            self.employees.values().map(|e| (e.employee_id, e.email.as_str())),
            email,
            except,
        )
    }

    fn admin_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        Self::email_taken(
            self.admins.values().map(|a| (a.admin_id, a.email.as_str())),
            email,
            except,
        )
    }

    fn require_employee(&self, id: i64) -> Result<(), AppError> {
        if self.employees.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::ReferentialIntegrity(format!("Employee {} does not exist", id)))
        }
    }

    fn require_driver(&self, id: i64) -> Result<(), AppError> {
        if self.drivers.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::ReferentialIntegrity(format!("Driver {} does not exist", id)))
        }
    }
}

/// Case-folded name first so lower-case names interleave with capitalised ones.
fn by_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("Email '{}' already exists", email))
}

/// Checks the optimistic-concurrency token of a row about to be replaced.
fn check_version(kind: &str, id: i64, current: Option<i32>, expected: i32) -> Result<(), AppError> {
    match current {
        None => Err(missing(kind, id)),
        Some(version) if version != expected => Err(stale_version(kind, id)),
        Some(_) => Ok(()),
    }
}

/// Store kept entirely in process memory. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalServerError("Store poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let tables = self.tables()?;
        let mut employees: Vec<Employee> = tables.employees.values().cloned().collect();
        employees.sort_by(|a, b| by_name(&a.name, &b.name).then(a.employee_id.cmp(&b.employee_id)));
        Ok(employees)
    }

    async fn get_employee(&self, id: i64) -> Result<Option<Employee>, AppError> {
        Ok(self.tables()?.employees.get(&id).cloned())
    }

    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, AppError> {
        let key = email_key(email);
        Ok(self
            .tables()?
            .employees
            .values()
            .find(|e| email_key(&e.email) == key)
            .cloned())
    }

    async fn insert_employee(&self, fields: &EmployeeFields) -> Result<Employee, AppError> {
        let mut tables = self.tables()?;
        if tables.employee_email_taken(&fields.email, None) {
            return Err(duplicate_email(&fields.email));
        }
        let now = Utc::now();
        let employee = Employee {
            employee_id: tables.next_id(),
            name: fields.name.clone(),
            email: fields.email.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.employees.insert(employee.employee_id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(&self, id: i64, version: i32, fields: &EmployeeFields) -> Result<Employee, AppError> {
        let mut tables = self.tables()?;
        check_version("Employee", id, tables.employees.get(&id).map(|e| e.version), version)?;
        if tables.employee_email_taken(&fields.email, Some(id)) {
            return Err(duplicate_email(&fields.email));
        }
        let employee = tables.employees.get_mut(&id).ok_or_else(|| missing("Employee", id))?;
        employee.name = fields.name.clone();
        employee.email = fields.email.clone();
        employee.version += 1;
        employee.updated_at = Utc::now();
        Ok(employee.clone())
    }

    async fn delete_employee(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if !tables.employees.contains_key(&id) {
            return Err(missing("Employee", id));
        }
        if tables.drivers.values().any(|d| d.responsible_employee_id == id) {
            return Err(AppError::ReferentialIntegrity(format!(
                "Employee {} is still responsible for drivers",
                id
            )));
        }
        tables.employees.remove(&id);
        Ok(())
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, AppError> {
        let tables = self.tables()?;
        let mut admins: Vec<Admin> = tables.admins.values().cloned().collect();
        admins.sort_by(|a, b| by_name(&a.name, &b.name).then(a.admin_id.cmp(&b.admin_id)));
        Ok(admins)
    }

    async fn get_admin(&self, id: i64) -> Result<Option<Admin>, AppError> {
        Ok(self.tables()?.admins.get(&id).cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AppError> {
        let key = email_key(email);
        Ok(self
            .tables()?
            .admins
            .values()
            .find(|a| email_key(&a.email) == key)
            .cloned())
    }

    async fn insert_admin(&self, fields: &AdminFields) -> Result<Admin, AppError> {
        let mut tables = self.tables()?;
        if tables.admin_email_taken(&fields.email, None) {
            return Err(duplicate_email(&fields.email));
        }
        let now = Utc::now();
        let admin = Admin {
            admin_id: tables.next_id(),
            name: fields.name.clone(),
            email: fields.email.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.admins.insert(admin.admin_id, admin.clone());
        Ok(admin)
    }

    async fn update_admin(&self, id: i64, version: i32, fields: &AdminFields) -> Result<Admin, AppError> {
        let mut tables = self.tables()?;
        check_version("Admin", id, tables.admins.get(&id).map(|a| a.version), version)?;
        if tables.admin_email_taken(&fields.email, Some(id)) {
            return Err(duplicate_email(&fields.email));
        }
        let admin = tables.admins.get_mut(&id).ok_or_else(|| missing("Admin", id))?;
        admin.name = fields.name.clone();
        admin.email = fields.email.clone();
        admin.version += 1;
        admin.updated_at = Utc::now();
        Ok(admin.clone())
    }

    async fn delete_admin(&self, id: i64) -> Result<(), AppError> {
        self.tables()?
            .admins
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("Admin", id))
    }

    async fn list_drivers(&self, filter: &DriverFilter) -> Result<Vec<DriverWithOwner>, AppError> {
        let tables = self.tables()?;
        let search = filter.search.as_deref().filter(|s| !s.is_empty());
        let mut drivers = tables
            .drivers
            .values()
            .filter(|d| filter.responsible_employee_id.map_or(true, |id| d.responsible_employee_id == id))
            .filter(|d| {
                search.map_or(true, |s| {
                    contains_ignore_case(&d.driver_name, s) || contains_ignore_case(&d.car_reg, s)
                })
            })
            .map(|d| tables.driver_with_owner(d))
            .collect::<Result<Vec<_>, _>>()?;
        drivers.sort_by(|a, b| {
            by_name(&a.driver.driver_name, &b.driver.driver_name).then(a.driver.driver_id.cmp(&b.driver.driver_id))
        });
        Ok(drivers)
    }

    async fn get_driver(&self, id: i64) -> Result<Option<DriverWithOwner>, AppError> {
        let tables = self.tables()?;
        tables.drivers.get(&id).map(|d| tables.driver_with_owner(d)).transpose()
    }

    async fn insert_driver(&self, fields: &DriverFields) -> Result<Driver, AppError> {
        let mut tables = self.tables()?;
        tables.require_employee(fields.responsible_employee_id)?;
        let driver = Driver {
            driver_id: tables.next_id(),
            driver_name: fields.driver_name.clone(),
            car_reg: fields.car_reg.clone(),
            responsible_employee_id: fields.responsible_employee_id,
            version: 1,
        };
        tables.drivers.insert(driver.driver_id, driver.clone());
        Ok(driver)
    }

    async fn update_driver(&self, id: i64, version: i32, fields: &DriverFields) -> Result<Driver, AppError> {
        let mut tables = self.tables()?;
        check_version("Driver", id, tables.drivers.get(&id).map(|d| d.version), version)?;
        tables.require_employee(fields.responsible_employee_id)?;
        let driver = tables.drivers.get_mut(&id).ok_or_else(|| missing("Driver", id))?;
        driver.driver_name = fields.driver_name.clone();
        driver.car_reg = fields.car_reg.clone();
        driver.responsible_employee_id = fields.responsible_employee_id;
        driver.version += 1;
        Ok(driver.clone())
    }

    async fn delete_driver(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables.drivers.remove(&id).is_none() {
            return Err(missing("Driver", id));
        }
        tables.events.retain(|_, e| e.driver_id != id);
        Ok(())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventDetail>, AppError> {
        let tables = self.tables()?;
        let driver_name = filter.driver_name.as_deref().filter(|s| !s.is_empty());
        let employee_name = filter.employee_name.as_deref().filter(|s| !s.is_empty());
        let mut events = tables
            .events
            .values()
            .filter(|e| filter.driver_id.map_or(true, |id| e.driver_id == id))
            .filter(|e| filter.from.map_or(true, |from| e.event_date >= from))
            .filter(|e| filter.to.map_or(true, |to| e.event_date <= to))
            .map(|e| tables.event_detail(e))
            .collect::<Result<Vec<_>, _>>()?;
        events.retain(|e| {
            filter.responsible_employee_id.map_or(true, |id| e.responsible_employee_id == id)
                && driver_name.map_or(true, |n| contains_ignore_case(&e.driver_name, n))
                && employee_name.map_or(true, |n| contains_ignore_case(&e.responsible_employee_name, n))
        });
        events.sort_by(|a, b| {
            b.event
                .event_date
                .cmp(&a.event.event_date)
                .then(b.event.event_id.cmp(&a.event.event_id))
        });
        Ok(events)
    }

    async fn get_event(&self, id: i64) -> Result<Option<EventDetail>, AppError> {
        let tables = self.tables()?;
        tables.events.get(&id).map(|e| tables.event_detail(e)).transpose()
    }

    async fn insert_event(&self, fields: &EventFields) -> Result<DrivingEvent, AppError> {
        let mut tables = self.tables()?;
        tables.require_driver(fields.driver_id)?;
        let event = DrivingEvent {
            event_id: tables.next_id(),
            description: fields.description.clone(),
            event_date: fields.event_date,
            amount_out: fields.amount_out,
            amount_in: fields.amount_in,
            driver_id: fields.driver_id,
            version: 1,
        };
        tables.events.insert(event.event_id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: i64, version: i32, fields: &EventFields) -> Result<DrivingEvent, AppError> {
        let mut tables = self.tables()?;
        check_version("Driving event", id, tables.events.get(&id).map(|e| e.version), version)?;
        tables.require_driver(fields.driver_id)?;
        let event = tables.events.get_mut(&id).ok_or_else(|| missing("Driving event", id))?;
        event.description = fields.description.clone();
        event.event_date = fields.event_date;
        event.amount_out = fields.amount_out;
        event.amount_in = fields.amount_in;
        event.driver_id = fields.driver_id;
        event.version += 1;
        Ok(event.clone())
    }

    async fn delete_event(&self, id: i64) -> Result<(), AppError> {
        self.tables()?
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("Driving event", id))
    }
}
