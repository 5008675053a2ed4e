use argon2::{Argon2, password_hash::PasswordHasher, password_hash::SaltString, PasswordVerifier};
use crate::errors::{AppError, FieldErrors};

pub const MIN_LENGTH: usize = 6;
pub const MAX_LENGTH: usize = 100;

/// Password rules enforced by the identity provider for every new credential.
pub fn check_policy(field: &str, password: &str) -> Result<(), AppError> {
    let mut messages = Vec::new();
    let length = password.chars().count();
    if length < MIN_LENGTH || length > MAX_LENGTH {
        messages.push(format!(
            "Password must be between {} and {} characters long",
            MIN_LENGTH, MAX_LENGTH
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        messages.push("Password must contain at least one digit".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        messages.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        messages.push("Password must contain at least one lowercase letter".to_string());
    }

    if messages.is_empty() {
        Ok(())
    } else {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), messages);
        Err(AppError::Validation(fields))
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::InternalServerError("Hashing error".to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = argon2::PasswordHash::new(password_hash)
        .map_err(|_| AppError::InternalServerError("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
