use rust_decimal::Decimal;
use validator::{Validate, ValidationError};
use crate::errors::AppError;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(AppError::from)
}

/// Amounts are stored as NUMERIC(18,2): non-negative, at most two decimals.
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount must not be negative".into());
        return Err(err);
    }
    if amount.normalize().scale() > 2 {
        let mut err = ValidationError::new("scale");
        err.message = Some("Amount must have at most two decimal places".into());
        return Err(err);
    }
    if amount.trunc() >= Decimal::from(10_000_000_000_000_000i64) {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount is too large".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects names made only of whitespace, which `length` alone lets through.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Value is required".into());
        return Err(err);
    }
    Ok(())
}

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Case-insensitive substring test used by the in-memory store.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_amount(&Decimal::new(-5, 0)).is_err());
        assert!(validate_amount(&Decimal::ZERO).is_ok());
        assert!(validate_amount(&Decimal::new(1999, 2)).is_ok());
    }

    #[test]
    fn amounts_keep_two_decimals() {
        assert!(validate_amount(&Decimal::new(12345, 3)).is_err());
        // 1.500 is still representable with two decimals.
        assert!(validate_amount(&Decimal::new(1500, 3)).is_ok());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn substring_match_ignores_case() {
        assert!(contains_ignore_case("Isabella Clark", "CLARK"));
        assert!(!contains_ignore_case("Isabella Clark", "turner"));
    }
}
