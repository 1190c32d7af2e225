use anyhow::Result;

use tenderhub_backend::config::{self, StorageBackend};
use tenderhub_backend::{app, db, logging, store::Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        storage = ?settings.storage_backend,
        "Starting TenderHub backend"
    );

    let store = match settings.storage_backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&settings).await?;
            if settings.run_migrations {
                db::run_migrations(&pool).await?;
            }
            Store::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Store::memory()
        }
    };

    let state = app::AppState::new(store, settings.clone());
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
