use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use crate::utils::validation::validate_not_blank;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Admin {
    pub admin_id: i64,
    pub name: String,
    pub email: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AdminFields {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct AdminInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: Option<String>,
}

impl AdminInput {
    pub fn fields(&self) -> AdminFields {
        AdminFields {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}
