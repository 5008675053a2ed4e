use log::{info, warn};

use crate::db::Store;
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driver::{DriverFilter, DriverOption};
use crate::models::driving_event::{DateRange, DrivingEvent, DrivingEventInput, EventDetail, EventFilter, EventFormOptions};
use crate::services::access::{forbidden, resolve_scope, Scope};
use crate::utils::validation::validate_payload;

pub async fn list_events(store: &dyn Store, principal: &Principal, range: DateRange) -> Result<Vec<EventDetail>, AppError> {
    let scope = resolve_scope(store, principal).await?;
    store
        .list_events(&EventFilter {
            responsible_employee_id: scope.employee_id(),
            from: range.from,
            to: range.to,
            ..EventFilter::default()
        })
        .await
}

async fn load_owned(store: &dyn Store, scope: &Scope, principal: &Principal, id: i64) -> Result<EventDetail, AppError> {
    let event = store
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Driving event {} not found", id)))?;
    if !scope.owns(event.responsible_employee_id) {
        warn!("{} denied access to driving event {}", principal.email, id);
        return Err(forbidden("driving event"));
    }
    Ok(event)
}

async fn ensure_driver_in_scope(store: &dyn Store, scope: &Scope, principal: &Principal, driver_id: i64) -> Result<(), AppError> {
    let driver = store
        .get_driver(driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))?;
    if !scope.owns(driver.driver.responsible_employee_id) {
        warn!("{} tried to attach an event to driver {}", principal.email, driver_id);
        return Err(forbidden("driver"));
    }
    Ok(())
}

pub async fn get_event(store: &dyn Store, principal: &Principal, id: i64) -> Result<EventDetail, AppError> {
    let scope = resolve_scope(store, principal).await?;
    load_owned(store, &scope, principal, id).await
}

pub async fn event_form_options(store: &dyn Store, principal: &Principal) -> Result<EventFormOptions, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let drivers = store
        .list_drivers(&DriverFilter {
            responsible_employee_id: scope.employee_id(),
            search: None,
        })
        .await?;
    Ok(EventFormOptions {
        drivers: drivers.iter().map(DriverOption::from).collect(),
    })
}

pub async fn create_event(store: &dyn Store, principal: &Principal, input: &DrivingEventInput) -> Result<DrivingEvent, AppError> {
    let scope = resolve_scope(store, principal).await?;
    validate_payload(input)?;
    ensure_driver_in_scope(store, &scope, principal, input.driver_id).await?;

    let event = store.insert_event(&input.fields()).await?;
    info!(
        "Driving event {} recorded for driver {} by {}",
        event.event_id, event.driver_id, principal.email
    );
    Ok(event)
}

/// Both the event's current driver and the driver it is moved to must be
/// within scope.
pub async fn update_event(
    store: &dyn Store,
    principal: &Principal,
    id: i64,
    version: i32,
    input: &DrivingEventInput,
) -> Result<DrivingEvent, AppError> {
    let scope = resolve_scope(store, principal).await?;
    let current = load_owned(store, &scope, principal, id).await?;
    validate_payload(input)?;
    if input.driver_id != current.event.driver_id {
        ensure_driver_in_scope(store, &scope, principal, input.driver_id).await?;
    }

    let event = store.update_event(id, version, &input.fields()).await?;
    info!("Driving event {} updated by {}", id, principal.email);
    Ok(event)
}

pub async fn delete_event(store: &dyn Store, principal: &Principal, id: i64) -> Result<(), AppError> {
    let scope = resolve_scope(store, principal).await?;
    load_owned(store, &scope, principal, id).await?;
    store.delete_event(id).await?;
    info!("Driving event {} deleted by {}", id, principal.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, JOHN_EMAIL};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn input(driver_id: i64, out: i64, inc: i64) -> DrivingEventInput {
        DrivingEventInput {
            description: "Fueling".to_string(),
            event_date: Utc::now(),
            amount_out: Decimal::new(out, 0),
            amount_in: Decimal::new(inc, 0),
            driver_id,
        }
    }

    #[actix_web::test]
    async fn negative_amount_is_rejected_before_anything_is_written() {
        let fx = testing::seeded().await;
        let turner = fx.driver_by_name("David Turner").await;
        let before = fx.store().list_events(&EventFilter::default()).await.unwrap().len();

        let err = create_event(fx.store(), &testing::admin(), &input(turner.driver_id, -5, 0))
            .await
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("amount_out"));
        assert_eq!(fx.store().list_events(&EventFilter::default()).await.unwrap().len(), before);
    }

    #[actix_web::test]
    async fn employee_records_events_only_for_own_drivers() {
        let fx = testing::seeded().await;
        let john = testing::employee(JOHN_EMAIL);
        let turner = fx.driver_by_name("David Turner").await;
        let carter = fx.driver_by_name("Sophia Carter").await;

        let event = create_event(fx.store(), &john, &input(turner.driver_id, 40, 0)).await.unwrap();
        assert_eq!(event.driver_id, turner.driver_id);
        assert_eq!(event.amount_out, Decimal::new(40, 0));

        let err = create_event(fx.store(), &john, &input(carter.driver_id, 40, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = create_event(fx.store(), &john, &input(99_999, 40, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn event_cannot_be_moved_to_a_foreign_driver() {
        let fx = testing::seeded().await;
        let john = testing::employee(JOHN_EMAIL);
        let turner = fx.driver_by_name("David Turner").await;
        let carter = fx.driver_by_name("Sophia Carter").await;
        let event = create_event(fx.store(), &john, &input(turner.driver_id, 10, 0)).await.unwrap();

        let err = update_event(fx.store(), &john, event.event_id, event.version, &input(carter.driver_id, 10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let moved = update_event(fx.store(), &testing::admin(), event.event_id, event.version, &input(carter.driver_id, 10, 5))
            .await
            .unwrap();
        assert_eq!(moved.driver_id, carter.driver_id);
        assert_eq!(moved.amount_in, Decimal::new(5, 0));
    }

    #[actix_web::test]
    async fn foreign_events_are_hidden_and_protected() {
        let fx = testing::seeded().await;
        let john = testing::employee(JOHN_EMAIL);
        let carter = fx.driver_by_name("Sophia Carter").await;
        let foreign = fx
            .store()
            .list_events(&EventFilter {
                driver_id: Some(carter.driver_id),
                ..EventFilter::default()
            })
            .await
            .unwrap()
            .remove(0);

        let mine = list_events(fx.store(), &john, DateRange::default()).await.unwrap();
        assert!(!mine.is_empty());
        assert!(mine.iter().all(|e| e.event.event_id != foreign.event.event_id));

        let err = get_event(fx.store(), &john, foreign.event.event_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete_event(fx.store(), &john, foreign.event.event_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(fx.store().get_event(foreign.event.event_id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn listing_honours_the_date_range() {
        let fx = testing::seeded().await;
        let range = DateRange {
            from: Some(Utc::now() - Duration::days(5) - Duration::hours(12)),
            to: None,
        };
        let recent = list_events(fx.store(), &testing::admin(), range).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert!(recent
            .windows(2)
            .all(|pair| pair[0].event.event_date >= pair[1].event.event_date));
    }

    #[actix_web::test]
    async fn options_list_own_drivers() {
        let fx = testing::seeded().await;
        let options = event_form_options(fx.store(), &testing::employee(JOHN_EMAIL)).await.unwrap();
        let names: Vec<_> = options.drivers.iter().map(|d| d.driver_name.as_str()).collect();
        assert_eq!(names, vec!["David Turner", "Isabella Clark", "Olivia Evans"]);
    }

    #[actix_web::test]
    async fn deleted_event_is_gone() {
        let fx = testing::seeded().await;
        let john = testing::employee(JOHN_EMAIL);
        let turner = fx.driver_by_name("David Turner").await;
        let event = create_event(fx.store(), &john, &input(turner.driver_id, 1, 0)).await.unwrap();
        delete_event(fx.store(), &john, event.event_id).await.unwrap();
        let err = get_event(fx.store(), &john, event.event_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
