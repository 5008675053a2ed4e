//! Login handling and the paired writes that keep domain records and
//! identity-provider principals in step.

use log::{error, info, warn};
use std::future::Future;

use crate::errors::AppError;
use crate::identity::{IdentityProvider, Principal};
use crate::models::account::{ChangePassword, LoginRequest, LoginResponse};
use crate::utils::jwt::TokenKeys;
use crate::utils::password;
use crate::utils::validation::validate_payload;

pub async fn login(
    identity: &dyn IdentityProvider,
    keys: &TokenKeys,
    request: &LoginRequest,
) -> Result<LoginResponse, AppError> {
    validate_payload(request)?;
    let principal = identity
        .authenticate(request.email.trim(), &request.password)
        .await
        .map_err(|err| {
            warn!("Failed login for {}", request.email);
            err
        })?;

    let landing = if principal.is_admin() {
        "admin"
    } else if principal.is_employee() {
        "employee"
    } else {
        "home"
    };
    let token = keys.generate_token(&principal)?;
    info!("{} logged in", principal.email);
    Ok(LoginResponse {
        email: principal.email,
        roles: principal.roles,
        landing,
        token,
    })
}

/// Admins changing someone else's password reset it outright; everybody
/// else may only change their own and must know the current one.
pub async fn change_password(
    identity: &dyn IdentityProvider,
    principal: &Principal,
    request: &ChangePassword,
) -> Result<(), AppError> {
    validate_payload(request)?;
    let target = request.email.trim();

    if principal.is_admin() && !principal.is(target) {
        if identity.find_principal(target).await?.is_none() {
            return Err(AppError::NotFound(format!("No login exists for '{}'", target)));
        }
        identity.reset_password(target, &request.new_password).await?;
        info!("Password for {} reset by {}", target, principal.email);
        return Ok(());
    }

    if !principal.is(target) {
        warn!("{} attempted to change the password of {}", principal.email, target);
        return Err(AppError::Forbidden("You may only change your own password".to_string()));
    }
    if request.current_password.is_empty() {
        return Err(AppError::invalid("current_password", "Current password is required"));
    }
    identity
        .change_password(&principal.email, &request.current_password, &request.new_password)
        .await?;
    info!("{} changed their password", principal.email);
    Ok(())
}

pub(crate) fn required_password(password: Option<&str>) -> Result<&str, AppError> {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => {
            password::check_policy("password", password)?;
            Ok(password)
        }
        None => Err(AppError::invalid("password", "Password is required")),
    }
}

pub(crate) fn check_optional_password(password: Option<&str>) -> Result<(), AppError> {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => password::check_policy("password", password),
        None => Ok(()),
    }
}

/// Returns `cause` after removing the login.
pub(crate) async fn discard_principal(identity: &dyn IdentityProvider, email: &str, cause: AppError) -> AppError {
    match identity.remove_principal(email).await {
        Ok(_) => {
            warn!("Removed login {} after its record failed to save: {}", email, cause);
            cause
        }
        Err(undo) => {
            error!("Orphaned login {}: record failed ({}) and removal failed ({})", email, cause, undo);
            AppError::InternalServerError(format!(
                "Record was not saved and login '{}' could not be removed; contact an administrator",
                email
            ))
        }
    }
}

pub(crate) async fn update_with_login<T, F, Fut>(
    identity: &dyn IdentityProvider,
    old_email: &str,
    new_email: &str,
    write: F,
) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut renamed = false;
    if old_email != new_email {
        if identity.find_principal(old_email).await?.is_some() {
            identity.rename_principal(old_email, new_email).await?;
            renamed = true;
        } else {
            warn!("No login for {}; updating the record only", old_email);
        }
    }

    match write().await {
        Ok(value) => Ok(value),
        Err(err) if renamed => match identity.rename_principal(new_email, old_email).await {
            Ok(()) => Err(err),
            Err(undo) => {
                error!("Login {} left renamed to {} after failed update ({}): {}", old_email, new_email, err, undo);
                Err(AppError::InternalServerError(format!(
                    "Record was not saved and login '{}' could not be restored; contact an administrator",
                    old_email
                )))
            }
        },
        Err(err) => Err(err),
    }
}

pub(crate) async fn delete_with_login<F, Fut>(identity: &dyn IdentityProvider, email: &str, delete: F) -> Result<(), AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    let removed = match identity.remove_principal(email).await {
        Ok(record) => Some(record),
        Err(AppError::NotFound(_)) => {
            warn!("No login for {}; deleting the record only", email);
            None
        }
        Err(err) => return Err(err),
    };

    if let Err(err) = delete().await {
        if let Some(record) = removed {
            if let Err(undo) = identity.restore_principal(record).await {
                error!("Login {} lost after failed delete ({}): {}", email, err, undo);
                return Err(AppError::InternalServerError(format!(
                    "Record was not deleted but login '{}' could not be restored; contact an administrator",
                    email
                )));
            }
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::MemoryIdentity;
    use crate::identity::Role;
    use crate::testing::{self, JOHN_EMAIL};
    use chrono::Duration;

    fn change(email: &str, current: &str, new: &str, confirm: &str) -> ChangePassword {
        ChangePassword {
            email: email.to_string(),
            current_password: current.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[actix_web::test]
    async fn login_lands_by_role() {
        let fx = testing::seeded().await;
        let keys = TokenKeys::new("secret", Duration::minutes(30));
        let response = login(
            fx.identity(),
            &keys,
            &LoginRequest {
                email: JOHN_EMAIL.to_string(),
                password: testing::EMPLOYEE_PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.landing, "employee");
        assert_eq!(keys.validate_token(&response.token).unwrap().sub, JOHN_EMAIL);
    }

    #[actix_web::test]
    async fn confirmation_must_match() {
        let identity = MemoryIdentity::new();
        let principal = Principal::new("a@example.com", vec![Role::Employee]);
        let err = change_password(&identity, &principal, &change("a@example.com", "Passw0rd", "NewPass1", "Other1"))
            .await
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("confirm_password"));
    }

    #[actix_web::test]
    async fn employee_changes_only_own_password() {
        let fx = testing::seeded().await;
        let john = testing::employee(JOHN_EMAIL);
        let err = change_password(
            fx.identity(),
            &john,
            &change("emily.johnson@example.com", testing::EMPLOYEE_PASSWORD, "NewPass1", "NewPass1"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        change_password(
            fx.identity(),
            &john,
            &change(JOHN_EMAIL, testing::EMPLOYEE_PASSWORD, "NewPass1", "NewPass1"),
        )
        .await
        .unwrap();
        assert!(fx.identity().authenticate(JOHN_EMAIL, "NewPass1").await.is_ok());
    }

    #[actix_web::test]
    async fn admin_resets_without_current_password() {
        let fx = testing::seeded().await;
        change_password(fx.identity(), &testing::admin(), &change(JOHN_EMAIL, "", "Reset123", "Reset123"))
            .await
            .unwrap();
        assert!(fx.identity().authenticate(JOHN_EMAIL, "Reset123").await.is_ok());

        let err = change_password(
            fx.identity(),
            &testing::admin(),
            &change("nobody@example.com", "", "Reset123", "Reset123"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn failed_delete_restores_the_login() {
        let identity = MemoryIdentity::new();
        identity.create_principal("a@example.com", "Passw0rd", Role::Employee).await.unwrap();

        let result = delete_with_login(&identity, "a@example.com", || async {
            Err(AppError::ReferentialIntegrity("still referenced".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::ReferentialIntegrity(_))));
        assert!(identity.authenticate("a@example.com", "Passw0rd").await.is_ok());
    }

    #[actix_web::test]
    async fn failed_update_renames_the_login_back() {
        let identity = MemoryIdentity::new();
        identity.create_principal("a@example.com", "Passw0rd", Role::Employee).await.unwrap();

        let result: Result<(), AppError> = update_with_login(&identity, "a@example.com", "b@example.com", || async {
            Err(AppError::ConcurrencyConflict("stale".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::ConcurrencyConflict(_))));
        assert!(identity.find_principal("a@example.com").await.unwrap().is_some());
        assert!(identity.find_principal("b@example.com").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn discarded_login_is_gone() {
        let identity = MemoryIdentity::new();
        identity.create_principal("a@example.com", "Passw0rd", Role::Admin).await.unwrap();
        let err = discard_principal(&identity, "a@example.com", AppError::Conflict("dup".to_string())).await;
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(identity.find_principal("a@example.com").await.unwrap().is_none());
    }
}
