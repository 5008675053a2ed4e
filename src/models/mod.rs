use serde::Deserialize;

pub mod account;
pub mod admin;
pub mod driver;
pub mod driving_event;
pub mod employee;

/// Edit payload: the record's fields plus the `version` they were read at.
#[derive(Deserialize, Debug, Clone)]
pub struct Versioned<T> {
    #[serde(flatten)]
    pub fields: T,
    pub version: i32,
}
