use log::{error, info};

use crate::db::{stale_version, Store};
use crate::errors::AppError;
use crate::identity::{IdentityProvider, Principal, Role};
use crate::models::admin::{Admin, AdminInput};
use crate::services::access::require_admin;
use crate::services::accounts;
use crate::utils::validation::validate_payload;

pub async fn list_admins(store: &dyn Store, principal: &Principal) -> Result<Vec<Admin>, AppError> {
    require_admin(principal)?;
    store.list_admins().await
}

pub async fn get_admin(store: &dyn Store, principal: &Principal, id: i64) -> Result<Admin, AppError> {
    require_admin(principal)?;
    store
        .get_admin(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Admin {} not found", id)))
}

pub async fn create_admin(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    input: &AdminInput,
) -> Result<Admin, AppError> {
    require_admin(principal)?;
    validate_payload(input)?;
    let password = accounts::required_password(input.password.as_deref())?;
    let fields = input.fields();

    if store.find_admin_by_email(&fields.email).await?.is_some() {
        return Err(AppError::Conflict(format!("Admin with email '{}' already exists", fields.email)));
    }

    identity.create_principal(&fields.email, password, Role::Admin).await?;

    match store.insert_admin(&fields).await {
        Ok(admin) => {
            info!("Admin {} ({}) created by {}", admin.admin_id, admin.email, principal.email);
            Ok(admin)
        }
        Err(err) => Err(accounts::discard_principal(identity, &fields.email, err).await),
    }
}

pub async fn update_admin(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    id: i64,
    version: i32,
    input: &AdminInput,
) -> Result<Admin, AppError> {
    require_admin(principal)?;
    let current = get_admin(store, principal, id).await?;
    validate_payload(input)?;
    accounts::check_optional_password(input.password.as_deref())?;
    if current.version != version {
        return Err(stale_version("Admin", id));
    }
    let fields = input.fields();

    let updated = accounts::update_with_login(identity, &current.email, &fields.email, || {
        store.update_admin(id, version, &fields)
    })
    .await?;

    if let Some(password) = input.password.as_deref().filter(|p| !p.is_empty()) {
        identity.reset_password(&updated.email, password).await.map_err(|err| {
            error!("Admin {} saved but password reset failed: {}", id, err);
            err
        })?;
    }

    info!("Admin {} updated by {}", id, principal.email);
    Ok(updated)
}

pub async fn delete_admin(
    store: &dyn Store,
    identity: &dyn IdentityProvider,
    principal: &Principal,
    id: i64,
) -> Result<(), AppError> {
    let admin = get_admin(store, principal, id).await?;
    accounts::delete_with_login(identity, &admin.email, || store.delete_admin(id)).await?;
    info!("Admin {} ({}) deleted by {}", id, admin.email, principal.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ADMIN_EMAIL, JOHN_EMAIL};

    fn input(name: &str, email: &str, password: Option<&str>) -> AdminInput {
        AdminInput {
            name: name.to_string(),
            email: email.to_string(),
            password: password.map(str::to_string),
        }
    }

    #[actix_web::test]
    async fn admin_records_are_admin_only() {
        let fx = testing::seeded().await;
        let err = list_admins(fx.store(), &testing::employee(JOHN_EMAIL)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admins = list_admins(fx.store(), &testing::admin()).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, ADMIN_EMAIL);
    }

    #[actix_web::test]
    async fn new_admin_can_log_in_until_deleted() {
        let fx = testing::seeded().await;
        let bob = create_admin(
            fx.store(),
            fx.identity(),
            &testing::admin(),
            &input("Bob Boss", "bob.boss@example.com", Some("Boss1234")),
        )
        .await
        .unwrap();
        let login = fx.identity().authenticate("bob.boss@example.com", "Boss1234").await.unwrap();
        assert!(login.is_admin());

        delete_admin(fx.store(), fx.identity(), &testing::admin(), bob.admin_id)
            .await
            .unwrap();
        assert!(fx.identity().find_principal("bob.boss@example.com").await.unwrap().is_none());
        assert!(fx.store().get_admin(bob.admin_id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn email_change_keeps_login_in_sync() {
        let fx = testing::seeded().await;
        let alice = fx.store().find_admin_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
        update_admin(
            fx.store(),
            fx.identity(),
            &testing::admin(),
            alice.admin_id,
            alice.version,
            &input("Alice Admin", "alice@example.com", None),
        )
        .await
        .unwrap();
        assert!(fx
            .identity()
            .authenticate("alice@example.com", testing::ADMIN_PASSWORD)
            .await
            .is_ok());
    }
}
