mod config;
mod db;
mod errors;
mod handlers;
mod identity;
mod models;
mod seed;
mod services;
mod state;
mod utils;
#[cfg(test)]
mod testing;

use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use crate::config::Config;
use crate::db::memory::MemoryStore;
use crate::db::postgres::PgStore;
use crate::db::Store;
use crate::identity::memory::MemoryIdentity;
use crate::identity::postgres::PgIdentity;
use crate::identity::IdentityProvider;
use crate::state::AppState;
use crate::utils::jwt::TokenKeys;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn build_state(config: &Config) -> io::Result<AppState> {
    let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl);

    let (store, identity): (Arc<dyn Store>, Arc<dyn IdentityProvider>) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .map_err(|err| startup_error("Failed to connect to the database", err))?;
            let store = PgStore::new(pool.clone());
            store
                .migrate()
                .await
                .map_err(|err| startup_error("Failed to run migrations", err))?;
            info!("Using the Postgres store");
            let store: Arc<dyn Store> = Arc::new(store);
            let identity: Arc<dyn IdentityProvider> = Arc::new(PgIdentity::new(pool));
            (store, identity)
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store with demo data");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            let identity: Arc<dyn IdentityProvider> = Arc::new(MemoryIdentity::new());
            (store, identity)
        }
    };

    if config.seed_demo_data || config.database_url.is_none() {
        seed::seed_demo_data(store.as_ref(), identity.as_ref())
            .await
            .map_err(|err| startup_error("Failed to seed demo data", err))?;
    }

    Ok(AppState::new(store, identity, tokens))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|err| startup_error("Invalid configuration", err))?;
    let state = web::Data::new(build_state(&config).await?);

    info!("Starting server at {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
