use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{duplicate_login, email_key, invalid_login, unknown_login, IdentityProvider, Principal, PrincipalRecord, Role};
use crate::errors::AppError;
use crate::utils::password;

/// In-process identity provider, keyed by lower-cased login name.
#[derive(Default)]
pub struct MemoryIdentity {
    principals: Mutex<HashMap<String, PrincipalRecord>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn principals(&self) -> Result<MutexGuard<'_, HashMap<String, PrincipalRecord>>, AppError> {
        self.principals
            .lock()
            .map_err(|_| AppError::InternalServerError("Identity store poisoned".to_string()))
    }

    fn stored_hash(&self, email: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .principals()?
            .get(&email_key(email))
            .map(|record| record.password_hash.clone()))
    }

    fn set_hash(&self, email: &str, password_hash: String) -> Result<(), AppError> {
        let mut principals = self.principals()?;
        let record = principals
            .get_mut(&email_key(email))
            .ok_or_else(|| unknown_login(email))?;
        record.password_hash = password_hash;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AppError> {
        let record = self
            .principals()?
            .get(&email_key(email))
            .cloned()
            .ok_or_else(invalid_login)?;
        if password::verify_password(password, &record.password_hash)? {
            Ok(record.principal())
        } else {
            Err(invalid_login())
        }
    }

    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, AppError> {
        Ok(self
            .principals()?
            .get(&email_key(email))
            .map(PrincipalRecord::principal))
    }

    async fn create_principal(&self, email: &str, password: &str, role: Role) -> Result<Principal, AppError> {
        password::check_policy("password", password)?;
        // Hash outside the lock, then re-check for a racing creator.
        let password_hash = password::hash_password(password)?;
        let mut principals = self.principals()?;
        let key = email_key(email);
        if principals.contains_key(&key) {
            return Err(duplicate_login(email));
        }
        let record = PrincipalRecord {
            email: email.to_string(),
            password_hash,
            roles: vec![role],
        };
        let principal = record.principal();
        principals.insert(key, record);
        Ok(principal)
    }

    async fn remove_principal(&self, email: &str) -> Result<PrincipalRecord, AppError> {
        self.principals()?
            .remove(&email_key(email))
            .ok_or_else(|| unknown_login(email))
    }

    async fn restore_principal(&self, record: PrincipalRecord) -> Result<(), AppError> {
        let mut principals = self.principals()?;
        let key = email_key(&record.email);
        if principals.contains_key(&key) {
            return Err(duplicate_login(&record.email));
        }
        principals.insert(key, record);
        Ok(())
    }

    async fn rename_principal(&self, old_email: &str, new_email: &str) -> Result<(), AppError> {
        let mut principals = self.principals()?;
        let old_key = email_key(old_email);
        let new_key = email_key(new_email);
        if old_key != new_key && principals.contains_key(&new_key) {
            return Err(duplicate_login(new_email));
        }
        let mut record = principals
            .remove(&old_key)
            .ok_or_else(|| unknown_login(old_email))?;
        record.email = new_email.to_string();
        principals.insert(new_key, record);
        Ok(())
    }

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AppError> {
        password::check_policy("new_password", new_password)?;
        if self.stored_hash(email)?.is_none() {
            return Err(unknown_login(email));
        }
        let password_hash = password::hash_password(new_password)?;
        self.set_hash(email, password_hash)
    }

    async fn change_password(&self, email: &str, old_password: &str, new_password: &str) -> Result<(), AppError> {
        let current = self.stored_hash(email)?.ok_or_else(|| unknown_login(email))?;
        if !password::verify_password(old_password, &current)? {
            return Err(AppError::invalid("current_password", "Current password is incorrect"));
        }
        password::check_policy("new_password", new_password)?;
        let password_hash = password::hash_password(new_password)?;
        self.set_hash(email, password_hash)
    }
}
