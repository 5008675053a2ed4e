use async_trait::async_trait;
use sqlx::PgPool;

use super::{duplicate_login, invalid_login, unknown_login, IdentityProvider, Principal, PrincipalRecord, Role};
use crate::errors::AppError;
use crate::utils::password;

/// Principals kept in the `principals` table next to the domain tables.
#[derive(Clone)]
pub struct PgIdentity {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    email: String,
    password_hash: String,
    roles: Vec<String>,
}

impl TryFrom<PrincipalRow> for PrincipalRecord {
    type Error = AppError;

    fn try_from(row: PrincipalRow) -> Result<Self, Self::Error> {
        let roles = row
            .roles
            .iter()
            .map(|role| role.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PrincipalRecord {
            email: row.email,
            password_hash: row.password_hash,
            roles,
        })
    }
}

fn map_unique_violation(err: sqlx::Error, email: &str) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => duplicate_login(email),
        other => other,
    }
}

impl PgIdentity {
    pub fn new(pool: PgPool) -> Self {
        PgIdentity { pool }
    }

    async fn fetch(&self, email: &str) -> Result<Option<PrincipalRecord>, AppError> {
        sqlx::query_as::<_, PrincipalRow>(
            "SELECT email, password_hash, roles FROM principals WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(PrincipalRecord::try_from)
        .transpose()
    }

    async fn store_hash(&self, email: &str, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE principals SET password_hash = $1, updated_at = NOW() WHERE LOWER(email) = LOWER($2)",
        )
        .bind(password_hash)
        .bind(email)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(unknown_login(email));
        }
        Ok(())
    }

    async fn insert(&self, record: &PrincipalRecord) -> Result<(), AppError> {
        let roles: Vec<String> = record.roles.iter().map(|role| role.to_string()).collect();
        sqlx::query(
            "INSERT INTO principals (email, password_hash, roles, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW())",
        )
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(roles)
        .execute(&self.pool)
        .await
        .map_err(|err| map_unique_violation(err, &record.email))?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for PgIdentity {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AppError> {
        let record = self.fetch(email).await?.ok_or_else(invalid_login)?;
        if password::verify_password(password, &record.password_hash)? {
            Ok(record.principal())
        } else {
            Err(invalid_login())
        }
    }

    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, AppError> {
        Ok(self.fetch(email).await?.map(|record| record.principal()))
    }

    async fn create_principal(&self, email: &str, password: &str, role: Role) -> Result<Principal, AppError> {
        password::check_policy("password", password)?;
        if self.fetch(email).await?.is_some() {
            return Err(duplicate_login(email));
        }
        let record = PrincipalRecord {
            email: email.to_string(),
            password_hash: password::hash_password(password)?,
            roles: vec![role],
        };
        self.insert(&record).await?;
        Ok(record.principal())
    }

    async fn remove_principal(&self, email: &str) -> Result<PrincipalRecord, AppError> {
        sqlx::query_as::<_, PrincipalRow>(
            "DELETE FROM principals WHERE LOWER(email) = LOWER($1) RETURNING email, password_hash, roles",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(PrincipalRecord::try_from)
        .transpose()?
        .ok_or_else(|| unknown_login(email))
    }

    async fn restore_principal(&self, record: PrincipalRecord) -> Result<(), AppError> {
        self.insert(&record).await
    }

    async fn rename_principal(&self, old_email: &str, new_email: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE principals SET email = $1, updated_at = NOW() WHERE LOWER(email) = LOWER($2)",
        )
        .bind(new_email)
        .bind(old_email)
        .execute(&self.pool)
        .await
        .map_err(|err| map_unique_violation(err, new_email))?;
        if result.rows_affected() == 0 {
            return Err(unknown_login(old_email));
        }
        Ok(())
    }

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AppError> {
        password::check_policy("new_password", new_password)?;
        let password_hash = password::hash_password(new_password)?;
        self.store_hash(email, &password_hash).await
    }

    async fn change_password(&self, email: &str, old_password: &str, new_password: &str) -> Result<(), AppError> {
        let record = self.fetch(email).await?.ok_or_else(|| unknown_login(email))?;
        if !password::verify_password(old_password, &record.password_hash)? {
            return Err(AppError::invalid("current_password", "Current password is incorrect"));
        }
        password::check_policy("new_password", new_password)?;
        let password_hash = password::hash_password(new_password)?;
        self.store_hash(email, &password_hash).await
    }
}
