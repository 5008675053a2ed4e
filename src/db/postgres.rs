use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{missing, stale_version, Store};
use crate::errors::AppError;
use crate::models::admin::{Admin, AdminFields};
use crate::models::driver::{Driver, DriverFields, DriverFilter, DriverWithOwner};
use crate::models::driving_event::{DrivingEvent, EventDetail, EventFields, EventFilter};
use crate::models::employee::{Employee, EmployeeFields};
use crate::utils::validation::like_pattern;

const DRIVER_COLUMNS: &str = "SELECT d.driver_id, d.driver_name, d.car_reg, d.responsible_employee_id, d.version, \
     emp.name AS responsible_employee_name \
     FROM drivers d JOIN employees emp ON emp.employee_id = d.responsible_employee_id";

const EVENT_COLUMNS: &str = "SELECT e.event_id, e.description, e.event_date, e.amount_out, e.amount_in, e.driver_id, e.version, \
     d.driver_name, d.car_reg, d.responsible_employee_id, emp.name AS responsible_employee_name \
     FROM driving_events e \
     JOIN drivers d ON d.driver_id = e.driver_id \
     JOIN employees emp ON emp.employee_id = d.responsible_employee_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| AppError::DatabaseError(err.to_string()))
    }

    /// Tells a lost optimistic update apart from a missing row.
    async fn explain_missed_update(&self, table: &str, key: &str, kind: &str, id: i64) -> AppError {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)", table, key);
        match sqlx::query_scalar::<_, bool>(&sql).bind(id).fetch_one(&self.pool).await {
            Ok(true) => stale_version(kind, id),
            Ok(false) => missing(kind, id),
            Err(err) => err.into(),
        }
    }

    async fn delete_by_id(&self, table: &str, key: &str, kind: &str, id: i64) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", table, key);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(missing(kind, id));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        Ok(sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY LOWER(name), name, employee_id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_employee(&self, id: i64) -> Result<Option<Employee>, AppError> {
        Ok(sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE employee_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, AppError> {
        Ok(sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_employee(&self, fields: &EmployeeFields) -> Result<Employee, AppError> {
        Ok(sqlx::query_as::<_, Employee>(
            "INSERT INTO employees (name, email, version, created_at, updated_at) VALUES ($1, $2, 1, NOW(), NOW()) RETURNING *",
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_employee(&self, id: i64, version: i32, fields: &EmployeeFields) -> Result<Employee, AppError> {
        let updated = sqlx::query_as::<_, Employee>(
            "UPDATE employees SET name = $1, email = $2, version = version + 1, updated_at = NOW() \
             WHERE employee_id = $3 AND version = $4 RETURNING *",
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(employee) => Ok(employee),
            None => Err(self.explain_missed_update("employees", "employee_id", "Employee", id).await),
        }
    }

    async fn delete_employee(&self, id: i64) -> Result<(), AppError> {
        self.delete_by_id("employees", "employee_id", "Employee", id).await
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, AppError> {
        Ok(sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY LOWER(name), name, admin_id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_admin(&self, id: i64) -> Result<Option<Admin>, AppError> {
        Ok(sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE admin_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AppError> {
        Ok(sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_admin(&self, fields: &AdminFields) -> Result<Admin, AppError> {
        Ok(sqlx::query_as::<_, Admin>(
            "INSERT INTO admins (name, email, version, created_at, updated_at) VALUES ($1, $2, 1, NOW(), NOW()) RETURNING *",
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_admin(&self, id: i64, version: i32, fields: &AdminFields) -> Result<Admin, AppError> {
        let updated = sqlx::query_as::<_, Admin>(
            "UPDATE admins SET name = $1, email = $2, version = version + 1, updated_at = NOW() \
             WHERE admin_id = $3 AND version = $4 RETURNING *",
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(admin) => Ok(admin),
            None => Err(self.explain_missed_update("admins", "admin_id", "Admin", id).await),
        }
    }

    async fn delete_admin(&self, id: i64) -> Result<(), AppError> {
        self.delete_by_id("admins", "admin_id", "Admin", id).await
    }

    async fn list_drivers(&self, filter: &DriverFilter) -> Result<Vec<DriverWithOwner>, AppError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(DRIVER_COLUMNS);
        query.push(" WHERE TRUE");
        if let Some(employee_id) = filter.responsible_employee_id {
            query.push(" AND d.responsible_employee_id = ");
            query.push_bind(employee_id);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query.push(" AND (d.driver_name ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR d.car_reg ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        query.push(" ORDER BY LOWER(d.driver_name), d.driver_name, d.driver_id");

        Ok(query
            .build_query_as::<DriverWithOwner>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_driver(&self, id: i64) -> Result<Option<DriverWithOwner>, AppError> {
        let sql = format!("{} WHERE d.driver_id = $1", DRIVER_COLUMNS);
        Ok(sqlx::query_as::<_, DriverWithOwner>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_driver(&self, fields: &DriverFields) -> Result<Driver, AppError> {
        Ok(sqlx::query_as::<_, Driver>(
            "INSERT INTO drivers (driver_name, car_reg, responsible_employee_id, version) VALUES ($1, $2, $3, 1) RETURNING *",
        )
        .bind(&fields.driver_name)
        .bind(&fields.car_reg)
        .bind(fields.responsible_employee_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_driver(&self, id: i64, version: i32, fields: &DriverFields) -> Result<Driver, AppError> {
        let updated = sqlx::query_as::<_, Driver>(
            "UPDATE drivers SET driver_name = $1, car_reg = $2, responsible_employee_id = $3, version = version + 1 \
             WHERE driver_id = $4 AND version = $5 RETURNING *",
        )
        .bind(&fields.driver_name)
        .bind(&fields.car_reg)
        .bind(fields.responsible_employee_id)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(driver) => Ok(driver),
            None => Err(self.explain_missed_update("drivers", "driver_id", "Driver", id).await),
        }
    }

    async fn delete_driver(&self, id: i64) -> Result<(), AppError> {
        self.delete_by_id("drivers", "driver_id", "Driver", id).await
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventDetail>, AppError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(EVENT_COLUMNS);
        query.push(" WHERE TRUE");
        if let Some(employee_id) = filter.responsible_employee_id {
            query.push(" AND d.responsible_employee_id = ");
            query.push_bind(employee_id);
        }
        if let Some(driver_id) = filter.driver_id {
            query.push(" AND e.driver_id = ");
            query.push_bind(driver_id);
        }
        if let Some(from) = filter.from {
            query.push(" AND e.event_date >= ");
            query.push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND e.event_date <= ");
            query.push_bind(to);
        }
        if let Some(name) = filter.driver_name.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND d.driver_name ILIKE ");
            query.push_bind(like_pattern(name));
        }
        if let Some(name) = filter.employee_name.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND emp.name ILIKE ");
            query.push_bind(like_pattern(name));
        }
        query.push(" ORDER BY e.event_date DESC, e.event_id DESC");

        Ok(query
            .build_query_as::<EventDetail>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_event(&self, id: i64) -> Result<Option<EventDetail>, AppError> {
        let sql = format!("{} WHERE e.event_id = $1", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, EventDetail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_event(&self, fields: &EventFields) -> Result<DrivingEvent, AppError> {
        Ok(sqlx::query_as::<_, DrivingEvent>(
            "INSERT INTO driving_events (description, event_date, amount_out, amount_in, driver_id, version) \
             VALUES ($1, $2, $3, $4, $5, 1) RETURNING *",
        )
        .bind(&fields.description)
        .bind(fields.event_date)
        .bind(fields.amount_out)
        .bind(fields.amount_in)
        .bind(fields.driver_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_event(&self, id: i64, version: i32, fields: &EventFields) -> Result<DrivingEvent, AppError> {
        let updated = sqlx::query_as::<_, DrivingEvent>(
            "UPDATE driving_events SET description = $1, event_date = $2, amount_out = $3, amount_in = $4, \
             driver_id = $5, version = version + 1 WHERE event_id = $6 AND version = $7 RETURNING *",
        )
        .bind(&fields.description)
        .bind(fields.event_date)
        .bind(fields.amount_out)
        .bind(fields.amount_in)
        .bind(fields.driver_id)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(event) => Ok(event),
            None => Err(self.explain_missed_update("driving_events", "event_id", "Driving event", id).await),
        }
    }

    async fn delete_event(&self, id: i64) -> Result<(), AppError> {
        self.delete_by_id("driving_events", "event_id", "Driving event", id).await
    }
}
