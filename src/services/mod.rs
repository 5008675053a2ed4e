pub mod access;
pub mod accounts;
pub mod admins;
pub mod drivers;
pub mod driving_events;
pub mod employees;
pub mod reports;
