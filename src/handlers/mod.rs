pub mod admin;
pub mod auth;
pub mod driver;
pub mod driving_event;
pub mod employee;
pub mod report;

use actix_web::web;

use crate::errors::AppError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| AppError::invalid("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| AppError::invalid("query", err.to_string()).into()),
    )
    .service(
        web::scope("/v1")
            .service(web::resource("/auth/login").route(web::post().to(auth::login)))
            .service(web::resource("/auth/logout").route(web::post().to(auth::logout)))
            .service(web::resource("/auth/password").route(web::post().to(auth::change_password)))
            .service(
                web::resource("/employee")
                    .route(web::get().to(employee::get_employees))
                    .route(web::post().to(employee::create_employee)),
            )
            .service(
                web::resource("/employee/{id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::patch().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            )
            .service(
                web::resource("/admin")
                    .route(web::get().to(admin::get_admins))
                    .route(web::post().to(admin::create_admin)),
            )
            .service(
                web::resource("/admin/{id}")
                    .route(web::get().to(admin::get_admin))
                    .route(web::patch().to(admin::update_admin))
                    .route(web::delete().to(admin::delete_admin)),
            )
            .service(
                web::resource("/driver")
                    .route(web::get().to(driver::get_drivers))
                    .route(web::post().to(driver::create_driver)),
            )
            // before /driver/{id}
            .service(web::resource("/driver/options").route(web::get().to(driver::get_driver_options)))
            .service(
                web::resource("/driver/{id}")
                    .route(web::get().to(driver::get_driver))
                    .route(web::patch().to(driver::update_driver))
                    .route(web::delete().to(driver::delete_driver)),
            )
            .service(
                web::resource("/event")
                    .route(web::get().to(driving_event::get_events))
                    .route(web::post().to(driving_event::create_event)),
            )
            .service(web::resource("/event/options").route(web::get().to(driving_event::get_event_options)))
            .service(
                web::resource("/event/{id}")
                    .route(web::get().to(driving_event::get_event))
                    .route(web::patch().to(driving_event::update_event))
                    .route(web::delete().to(driving_event::delete_event)),
            )
            .service(web::resource("/notifications").route(web::get().to(report::get_notifications)))
            .service(web::resource("/history").route(web::get().to(report::get_history)))
            .service(web::resource("/recent-activity").route(web::get().to(report::get_recent_activity))),
    );
}
