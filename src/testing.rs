//! Shared fixtures for service and handler tests.

use std::sync::Arc;

use crate::db::memory::MemoryStore;
use crate::db::Store;
use crate::identity::memory::MemoryIdentity;
use crate::identity::{IdentityProvider, Principal, Role};
use crate::models::driver::{Driver, DriverFilter};
use crate::models::employee::Employee;
use crate::seed;

pub use crate::seed::{ADMIN_EMAIL, ADMIN_PASSWORD, EMPLOYEE_PASSWORD};

pub const JOHN_EMAIL: &str = "john.smith@example.com";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
}

impl Fixture {
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub async fn employee_by_email(&self, email: &str) -> Employee {
        self.store
            .find_employee_by_email(email)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no employee {email}"))
    }

    pub async fn driver_by_name(&self, name: &str) -> Driver {
        self.store
            .list_drivers(&DriverFilter::default())
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.driver.driver_name == name)
            .unwrap_or_else(|| panic!("no driver {name}"))
            .driver
    }
}

/// In-memory store and identity provider loaded with the demo data.
pub async fn seeded() -> Fixture {
    let fixture = Fixture {
        store: Arc::new(MemoryStore::new()),
        identity: Arc::new(MemoryIdentity::new()),
    };
    seed::seed_demo_data(fixture.store(), fixture.identity()).await.unwrap();
    fixture
}

pub fn admin() -> Principal {
    Principal::new(ADMIN_EMAIL, vec![Role::Admin])
}

pub fn employee(email: &str) -> Principal {
    Principal::new(email, vec![Role::Employee])
}
