//! Read-only roll-ups over driving events.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::db::Store;
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::driver::{DriverFilter, DriverSummary, DriverTotals};
use crate::models::driving_event::{EventDetail, EventFilter, HistoryQuery};
use crate::services::access::{require_admin, resolve_scope, Scope};

pub const ADMIN_NOTIFICATION_HOURS: i64 = 24;
pub const EMPLOYEE_NOTIFICATION_HOURS: i64 = 12;
pub const RECENT_ACTIVITY_HOURS: i64 = 24;

pub fn totals_by_driver(events: &[EventDetail]) -> HashMap<i64, DriverTotals> {
    let mut totals: HashMap<i64, DriverTotals> = HashMap::new();
    for detail in events {
        totals.entry(detail.event.driver_id).or_default().add(&detail.event);
    }
    totals
}

pub fn notification_window(scope: &Scope) -> Duration {
    if scope.is_admin() {
        Duration::hours(ADMIN_NOTIFICATION_HOURS)
    } else {
        Duration::hours(EMPLOYEE_NOTIFICATION_HOURS)
    }
}

pub async fn notifications(store: &dyn Store, principal: &Principal, now: DateTime<Utc>) -> Result<Vec<EventDetail>, AppError> {
    let scope = resolve_scope(store, principal).await?;
    store
        .list_events(&EventFilter {
            responsible_employee_id: scope.employee_id(),
            from: Some(now - notification_window(&scope)),
            to: Some(now),
            ..EventFilter::default()
        })
        .await
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn history(store: &dyn Store, principal: &Principal, query: &HistoryQuery) -> Result<Vec<EventDetail>, AppError> {
    if query.from > query.to {
        return Err(AppError::invalid("from", "Start date must not be after end date"));
    }
    let scope = resolve_scope(store, principal).await?;
    store
        .list_events(&EventFilter {
            responsible_employee_id: scope.employee_id(),
            driver_id: None,
            from: Some(query.from),
            to: Some(query.to),
            driver_name: non_empty(&query.driver_name),
            employee_name: non_empty(&query.employee_name),
        })
        .await
}

/// Totals cover all events, not just the recent ones.
pub async fn recent_activity(store: &dyn Store, principal: &Principal, now: DateTime<Utc>) -> Result<Vec<DriverSummary>, AppError> {
    require_admin(principal)?;
    let recent = store
        .list_events(&EventFilter {
            from: Some(now - Duration::hours(RECENT_ACTIVITY_HOURS)),
            to: Some(now),
            ..EventFilter::default()
        })
        .await?;
    if recent.is_empty() {
        return Ok(Vec::new());
    }

    let totals = totals_by_driver(&store.list_events(&EventFilter::default()).await?);
    let active = totals_by_driver(&recent);
    Ok(store
        .list_drivers(&DriverFilter::default())
        .await?
        .into_iter()
        .filter(|d| active.contains_key(&d.driver.driver_id))
        .map(|driver| DriverSummary {
            totals: totals.get(&driver.driver.driver_id).copied().unwrap_or_default(),
            driver,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::driving_event::{DrivingEvent, EventFields};
    use crate::testing::{self, JOHN_EMAIL};
    use rust_decimal::Decimal;

    fn detail(event_id: i64, driver_id: i64, out: i64, inc: i64) -> EventDetail {
        EventDetail {
            event: DrivingEvent {
                event_id,
                description: "x".to_string(),
                event_date: Utc::now(),
                amount_out: Decimal::new(out, 2),
                amount_in: Decimal::new(inc, 2),
                driver_id,
                version: 1,
            },
            driver_name: "d".to_string(),
            car_reg: "r".to_string(),
            responsible_employee_id: 1,
            responsible_employee_name: "e".to_string(),
        }
    }

    async fn record(store: &dyn Store, driver_id: i64, at: DateTime<Utc>) -> i64 {
        store
            .insert_event(&EventFields {
                description: "Window probe".to_string(),
                event_date: at,
                amount_out: Decimal::ONE,
                amount_in: Decimal::ZERO,
                driver_id,
            })
            .await
            .unwrap()
            .event_id
    }

    fn ids(events: &[EventDetail]) -> Vec<i64> {
        events.iter().map(|e| e.event.event_id).collect()
    }

    #[test]
    fn totals_are_summed_per_driver() {
        let totals = totals_by_driver(&[detail(1, 7, 1050, 0), detail(2, 7, 25, 300), detail(3, 8, 0, 99)]);
        assert_eq!(totals[&7].total_amount_out, Decimal::new(1075, 2));
        assert_eq!(totals[&7].total_amount_in, Decimal::new(300, 2));
        assert_eq!(totals[&8].total_amount_in, Decimal::new(99, 2));
        assert!(!totals.contains_key(&9));
    }

    #[actix_web::test]
    async fn admin_window_is_a_day() {
        let fx = testing::seeded().await;
        let now = Utc::now();
        let turner = fx.driver_by_name("David Turner").await;
        let inside = record(fx.store(), turner.driver_id, now - Duration::hours(10)).await;
        let outside = record(fx.store(), turner.driver_id, now - Duration::hours(30)).await;

        let events = notifications(fx.store(), &testing::admin(), now).await.unwrap();
        assert!(ids(&events).contains(&inside));
        assert!(!ids(&events).contains(&outside));
        assert!(events.iter().all(|e| e.event.event_date >= now - Duration::hours(24)));
    }

    #[actix_web::test]
    async fn employee_window_is_half_a_day() {
        let fx = testing::seeded().await;
        let now = Utc::now();
        let turner = fx.driver_by_name("David Turner").await;
        let carter = fx.driver_by_name("Sophia Carter").await;
        let recent = record(fx.store(), turner.driver_id, now - Duration::hours(2)).await;
        let older = record(fx.store(), turner.driver_id, now - Duration::hours(13)).await;
        let foreign = record(fx.store(), carter.driver_id, now - Duration::hours(1)).await;

        let events = notifications(fx.store(), &testing::employee(JOHN_EMAIL), now).await.unwrap();
        assert_eq!(ids(&events), vec![recent]);
        assert!(!ids(&events).contains(&older));
        assert!(!ids(&events).contains(&foreign));

        let admin = notifications(fx.store(), &testing::admin(), now).await.unwrap();
        assert_eq!(ids(&admin)[..3], [foreign, recent, older]);
    }

    #[actix_web::test]
    async fn history_filters_by_name_ignoring_case() {
        let fx = testing::seeded().await;
        let now = Utc::now();
        let query = |driver: Option<&str>, employee: Option<&str>| HistoryQuery {
            from: now - Duration::days(30),
            to: now,
            driver_name: driver.map(str::to_string),
            employee_name: employee.map(str::to_string),
        };

        let everything = history(fx.store(), &testing::admin(), &query(Some("  "), None)).await.unwrap();
        assert_eq!(everything.len(), 20);

        let turner = history(fx.store(), &testing::admin(), &query(Some("TURNER"), None)).await.unwrap();
        assert_eq!(turner.len(), 3);
        assert!(turner.iter().all(|e| e.driver_name == "David Turner"));

        let sarah = history(fx.store(), &testing::admin(), &query(None, Some("williams"))).await.unwrap();
        assert!(!sarah.is_empty());
        assert!(sarah.iter().all(|e| e.responsible_employee_name == "Sarah Williams"));

        let scoped = history(fx.store(), &testing::employee(JOHN_EMAIL), &query(None, Some("williams")))
            .await
            .unwrap();
        assert!(scoped.is_empty());
    }

    #[actix_web::test]
    async fn history_rejects_inverted_range() {
        let fx = testing::seeded().await;
        let now = Utc::now();
        let err = history(
            fx.store(),
            &testing::admin(),
            &HistoryQuery {
                from: now,
                to: now - Duration::days(1),
                driver_name: None,
                employee_name: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn recent_activity_lists_active_drivers_for_admins_only() {
        let fx = testing::seeded().await;
        let now = Utc::now();
        let err = recent_activity(fx.store(), &testing::employee(JOHN_EMAIL), now).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let clark = fx.driver_by_name("Isabella Clark").await;
        record(fx.store(), clark.driver_id, now - Duration::hours(3)).await;
        let active = recent_activity(fx.store(), &testing::admin(), now).await.unwrap();
        let names: Vec<_> = active.iter().map(|d| d.driver.driver.driver_name.as_str()).collect();
        assert_eq!(names, vec!["Isabella Clark"]);
        assert_eq!(active[0].totals.total_amount_out, Decimal::new(21, 0));
        assert_eq!(active[0].totals.total_amount_in, Decimal::new(600, 0));
    }
}
