use std::sync::Arc;

use crate::db::Store;
use crate::identity::IdentityProvider;
use crate::utils::jwt::TokenKeys;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>, tokens: TokenKeys) -> Self {
        AppState { store, identity, tokens }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }
}
