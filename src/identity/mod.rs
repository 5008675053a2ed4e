//! Login identities and their credentials, kept apart from employee/admin records.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Employee => "Employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Employee" => Ok(Role::Employee),
            other => Err(AppError::InternalServerError(format!("Unknown role '{}'", other))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Principal {
    pub email: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(email: impl Into<String>, roles: Vec<Role>) -> Self {
        Principal {
            email: email.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_employee(&self) -> bool {
        self.has_role(Role::Employee)
    }

    pub fn is(&self, email: &str) -> bool {
        email_key(&self.email) == email_key(email)
    }
}

/// A stored principal including its credential hash, as handed back by
/// `remove_principal` so a compensating `restore_principal` can undo it.
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl PrincipalRecord {
    pub fn principal(&self) -> Principal {
        Principal::new(self.email.clone(), self.roles.clone())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Unknown email and wrong password fail the same way.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AppError>;

    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, AppError>;

    async fn create_principal(&self, email: &str, password: &str, role: Role) -> Result<Principal, AppError>;

    async fn remove_principal(&self, email: &str) -> Result<PrincipalRecord, AppError>;

    async fn restore_principal(&self, record: PrincipalRecord) -> Result<(), AppError>;

    async fn rename_principal(&self, old_email: &str, new_email: &str) -> Result<(), AppError>;

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AppError>;

    async fn change_password(&self, email: &str, old_password: &str, new_password: &str) -> Result<(), AppError>;
}

/// Folded form of an email. Logins and records match on this, like `LOWER(email)` in Postgres.
pub fn email_key(email: &str) -> String {
    email.to_lowercase()
}

pub(crate) fn invalid_login() -> AppError {
    AppError::Unauthorized("Invalid login attempt".to_string())
}

pub(crate) fn duplicate_login(email: &str) -> AppError {
    AppError::ExternalPrincipal(format!("Login '{}' is already taken", email))
}

pub(crate) fn unknown_login(email: &str) -> AppError {
    AppError::NotFound(format!("No login exists for '{}'", email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_matches_email_in_any_case() {
        let principal = Principal::new("Åsa.Berg@example.com", vec![Role::Employee]);
        assert!(principal.is("åsa.berg@example.com"));
        assert!(principal.is("ÅSA.BERG@EXAMPLE.COM"));
        assert!(!principal.is("asa.berg@example.com"));
    }
}
