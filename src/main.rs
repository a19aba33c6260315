use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::info;

use monday_backend::config::{AppConfig, StoreBackend};
use monday_backend::coordinator::AssignmentCoordinator;
use monday_backend::store::memory::MemoryStore;
use monday_backend::store::postgres::PgRecordStore;
use monday_backend::store::RecordStore;
use monday_backend::{db, handlers};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().map_err(|err| startup_error("Invalid configuration", err))?;

    let store: Arc<dyn RecordStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = db::create_pool(database_url, config.db_acquire_timeout)
                .await
                .map_err(|err| startup_error("Failed to connect to the database", err))?;
            db::run_migrations(&pool)
                .await
                .map_err(|err| startup_error("Failed to run migrations", err))?;
            Arc::new(PgRecordStore::new(pool))
        }
        StoreBackend::Memory { seed } => {
            log::warn!("Using the in-memory record store; data is lost on exit");
            let store = MemoryStore::new();
            for employee in seed {
                store
                    .seed_employee(&employee.name, &employee.surname, employee.role.clone())
                    .await;
            }
            info!("Seeded {} employees into the in-memory store", seed.len());
            Arc::new(store)
        }
    };

    let coordinator = web::Data::new(AssignmentCoordinator::new(store, config.edit_session_ttl));
    let bind_address = config.bind_address.clone();
    let config = web::Data::new(config);

    info!("Starting server at {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(coordinator.clone())
            .configure(handlers::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}
