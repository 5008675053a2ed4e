use log::{info, warn};

use crate::db::Store;
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driver::{
    Driver, DriverDetails, DriverFields, DriverFilter, DriverFormOptions, DriverInput, DriverSummary, DriverWithOwner,
};
use crate::models::driving_event::{DateRange, EventFilter};
use crate::models::employee::EmployeeOption;
use crate::services::access::{forbidden, resolve_scope, Scope};
use crate::services::reports;
use crate::utils::validation::validate_payload;

pub async fn list_drivers(
    store: &dyn Store,
    principal: &Principal,
    search: Option<&str>,
) -> Result<Vec<DriverSummary>, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let drivers = store
        .list_drivers(&DriverFilter {
            responsible_employee_id: scope.employee_id(),
            search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        })
        .await?;
    let events = store
        .list_events(&EventFilter {
            responsible_employee_id: scope.employee_id(),
            ..EventFilter::default()
        })
        .await?;
    let totals = reports::totals_by_driver(&events);

    Ok(drivers
        .into_iter()
        .map(|driver| DriverSummary {
            totals: totals.get(&driver.driver.driver_id).copied().unwrap_or_default(),
            driver,
        })
        .collect())
}

async fn load_owned(store: &dyn Store, scope: &Scope, principal: &Principal, id: i64) -> Result<DriverWithOwner, AppError> {
    let driver = store
        .get_driver(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", id)))?;
    if !scope.owns(driver.driver.responsible_employee_id) {
        warn!("{} denied access to driver {}", principal.email, id);
        return Err(forbidden("driver"));
    }
    Ok(driver)
}

/// Totals span all events; only the listed events are limited to `range`.
pub async fn get_driver_details(
    store: &dyn Store,
    principal: &Principal,
    id: i64,
    range: DateRange,
) -> Result<DriverDetails, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let driver = load_owned(store, &scope, principal, id).await?;
    let events = store
        .list_events(&EventFilter {
            driver_id: Some(id),
            ..EventFilter::default()
        })
        .await?;
    let totals = reports::totals_by_driver(&events)
        .get(&id)
        .copied()
        .unwrap_or_default();

    let events = events
        .into_iter()
        .filter(|e| range.from.map_or(true, |from| e.event.event_date >= from))
        .filter(|e| range.to.map_or(true, |to| e.event.event_date <= to))
        .collect();

    Ok(DriverDetails {
        summary: DriverSummary { driver, totals },
        events,
    })
}

pub async fn driver_form_options(store: &dyn Store, principal: &Principal) -> Result<DriverFormOptions, AppError> {
    let employees = match resolve_scope(store, principal).await? {
        Scope::All => store.list_employees().await?.iter().map(EmployeeOption::from).collect(),
        Scope::Employee(own) => vec![EmployeeOption::from(&own)],
    };
    Ok(DriverFormOptions { employees })
}

/// Admins assign any existing employee; employees always get themselves.
async fn assigned_owner(
    store: &dyn Store,
    scope: &Scope,
    requested: Option<i64>,
    fallback: Option<i64>,
) -> Result<i64, AppError> {
    match scope {
        Scope::Employee(own) => Ok(own.employee_id),
        Scope::All => {
            let owner = requested
                .or(fallback)
                .ok_or_else(|| AppError::invalid("responsible_employee_id", "Responsible employee is required"))?;
            if store.get_employee(owner).await?.is_none() {
                return Err(AppError::invalid(
                    "responsible_employee_id",
                    format!("Employee {} does not exist", owner),
                ));
            }
            Ok(owner)
        }
    }
}

pub async fn create_driver(store: &dyn Store, principal: &Principal, input: &DriverInput) -> Result<Driver, AppError> {
    let scope = resolve_scope(store, principal).await?;
    validate_payload(input)?;
    let responsible_employee_id = assigned_owner(store, &scope, input.responsible_employee_id, None).await?;

    let driver = store
        .insert_driver(&DriverFields {
            driver_name: input.driver_name.trim().to_string(),
            car_reg: input.car_reg.trim().to_string(),
            responsible_employee_id,
        })
        .await?;
    info!("Driver {} created by {}", driver.driver_id, principal.email);
    Ok(driver)
}

pub async fn update_driver(
    store: &dyn Store,
    principal: &Principal,
    id: i64,
    version: i32,
    input: &DriverInput,
) -> Result<Driver, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let current = load_owned(store, &scope, principal, id).await?;
    validate_payload(input)?;
    let responsible_employee_id = assigned_owner(
        store,
        &scope,
        input.responsible_employee_id,
        Some(current.driver.responsible_employee_id),
    )
    .await?;

    let driver = store
        .update_driver(
            id,
            version,
            &DriverFields {
                driver_name: input.driver_name.trim().to_string(),
                car_reg: input.car_reg.trim().to_string(),
                responsible_employee_id,
            },
        )
        .await?;
    info!("Driver {} updated by {}", id, principal.email);
    Ok(driver)
}

pub async fn delete_driver(store: &dyn Store, principal: &Principal, id: i64) -> Result<(), AppError> {
    let scope = resolve_scope(store, principal).await?;
    load_owned(store, &scope, principal, id).await?;
    store.delete_driver(id).await?;
    info!("Driver {} deleted by {}", id, principal.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, JOHN_EMAIL};
    use rust_decimal::Decimal;

    fn input(name: &str, owner: Option<i64>) -> DriverInput {
        DriverInput {
            driver_name: name.to_string(),
            car_reg: "NEW123".to_string(),
            responsible_employee_id: owner,
        }
    }

    fn names(drivers: &[DriverSummary]) -> Vec<&str> {
        drivers.iter().map(|d| d.driver.driver.driver_name.as_str()).collect()
    }

    #[actix_web::test]
    async fn john_sees_exactly_his_drivers_by_name() {
        let fx = testing::seeded().await;
        let drivers = list_drivers(fx.store(), &testing::employee(JOHN_EMAIL), None).await.unwrap();
        assert_eq!(names(&drivers), vec!["David Turner", "Isabella Clark", "Olivia Evans"]);
    }

    #[actix_web::test]
    async fn employees_never_see_foreign_drivers() {
        let fx = testing::seeded().await;
        for employee in fx.store().list_employees().await.unwrap() {
            let drivers = list_drivers(fx.store(), &testing::employee(&employee.email), None)
                .await
                .unwrap();
            assert!(!drivers.is_empty());
            assert!(drivers
                .iter()
                .all(|d| d.driver.driver.responsible_employee_id == employee.employee_id));
        }
        let all = list_drivers(fx.store(), &testing::admin(), None).await.unwrap();
        assert_eq!(all.len(), 10);
    }

    #[actix_web::test]
    async fn totals_match_the_events() {
        let fx = testing::seeded().await;
        let drivers = list_drivers(fx.store(), &testing::admin(), None).await.unwrap();
        for summary in drivers {
            let events = fx
                .store()
                .list_events(&EventFilter {
                    driver_id: Some(summary.driver.driver.driver_id),
                    ..EventFilter::default()
                })
                .await
                .unwrap();
            let out: Decimal = events.iter().map(|e| e.event.amount_out).sum();
            let inc: Decimal = events.iter().map(|e| e.event.amount_in).sum();
            assert_eq!(summary.totals.total_amount_out, out);
            assert_eq!(summary.totals.total_amount_in, inc);
        }
    }

    #[actix_web::test]
    async fn search_matches_name_or_registration() {
        let fx = testing::seeded().await;
        let by_name = list_drivers(fx.store(), &testing::admin(), Some("clark")).await.unwrap();
        assert_eq!(names(&by_name), vec!["Isabella Clark"]);
        let by_reg = list_drivers(fx.store(), &testing::admin(), Some("abc")).await.unwrap();
        assert_eq!(names(&by_reg), vec!["David Turner"]);
    }

    #[actix_web::test]
    async fn employee_created_driver_is_owned_by_them() {
        let fx = testing::seeded().await;
        let john = fx.employee_by_email(JOHN_EMAIL).await;
        let emily = fx.employee_by_email("emily.johnson@example.com").await;

        let driver = create_driver(fx.store(), &testing::employee(JOHN_EMAIL), &input("New Driver", Some(emily.employee_id)))
            .await
            .unwrap();
        assert_eq!(driver.responsible_employee_id, john.employee_id);

        let assigned = create_driver(fx.store(), &testing::admin(), &input("Admin Driver", Some(emily.employee_id)))
            .await
            .unwrap();
        assert_eq!(assigned.responsible_employee_id, emily.employee_id);
    }

    #[actix_web::test]
    async fn admin_must_name_an_existing_employee() {
        let fx = testing::seeded().await;
        let err = create_driver(fx.store(), &testing::admin(), &input("Nobody's", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = create_driver(fx.store(), &testing::admin(), &input("Nobody's", Some(99_999)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn foreign_driver_is_forbidden() {
        let fx = testing::seeded().await;
        let carter = fx.driver_by_name("Sophia Carter").await;
        let john = testing::employee(JOHN_EMAIL);

        let err = get_driver_details(fx.store(), &john, carter.driver_id, DateRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = update_driver(fx.store(), &john, carter.driver_id, carter.version, &input("Renamed", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete_driver(fx.store(), &john, carter.driver_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(fx.store().get_driver(carter.driver_id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn deleting_a_driver_removes_its_events() {
        let fx = testing::seeded().await;
        let turner = fx.driver_by_name("David Turner").await;
        let filter = EventFilter {
            driver_id: Some(turner.driver_id),
            ..EventFilter::default()
        };
        assert!(!fx.store().list_events(&filter).await.unwrap().is_empty());

        delete_driver(fx.store(), &testing::employee(JOHN_EMAIL), turner.driver_id)
            .await
            .unwrap();
        assert!(fx.store().get_driver(turner.driver_id).await.unwrap().is_none());
        assert!(fx.store().list_events(&filter).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn details_narrow_events_but_not_totals() {
        let fx = testing::seeded().await;
        let turner = fx.driver_by_name("David Turner").await;
        let all = get_driver_details(fx.store(), &testing::admin(), turner.driver_id, DateRange::default())
            .await
            .unwrap();
        let recent = get_driver_details(
            fx.store(),
            &testing::admin(),
            turner.driver_id,
            DateRange {
                from: Some(chrono::Utc::now() - chrono::Duration::days(3)),
                to: None,
            },
        )
        .await
        .unwrap();
        assert!(recent.events.len() < all.events.len());
        assert_eq!(recent.summary.totals, all.summary.totals);
        assert!(all
            .events
            .windows(2)
            .all(|pair| pair[0].event.event_date >= pair[1].event.event_date));
    }

    #[actix_web::test]
    async fn form_options_follow_scope() {
        let fx = testing::seeded().await;
        let own = driver_form_options(fx.store(), &testing::employee(JOHN_EMAIL)).await.unwrap();
        assert_eq!(own.employees.len(), 1);
        assert_eq!(own.employees[0].name, "John Smith");
        let all = driver_form_options(fx.store(), &testing::admin()).await.unwrap();
        assert_eq!(all.employees.len(), 4);
    }

    #[actix_web::test]
    async fn stale_driver_edit_conflicts() {
        let fx = testing::seeded().await;
        let turner = fx.driver_by_name("David Turner").await;
        let john = testing::employee(JOHN_EMAIL);
        update_driver(fx.store(), &john, turner.driver_id, turner.version, &input("David Turner", None))
            .await
            .unwrap();
        let err = update_driver(fx.store(), &testing::admin(), turner.driver_id, turner.version, &input("D. Turner", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrencyConflict(_)));
    }
}
