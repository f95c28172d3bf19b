use migration::MigratorTrait;
use remittance_api::config::StorageBackend;
use remittance_api::db::Repositories;
use remittance_api::{ api, AppError, Config, Result };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "remittance_api=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    let repos = match &config.storage {
        StorageBackend::Postgres(url) => {
            let db = sea_orm::Database::connect(url.as_str()).await?;
            tracing::info!("Database connected successfully");

            migration::Migrator::up(&db, None).await?;
            tracing::info!("Migrations completed successfully");

            Repositories::sea_orm(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on restart");
            Repositories::in_memory()
        }
    };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let seed = config.seed_default_data;

    let state = api::AppState::new(config, repos);
    if seed {
        state.seed_defaults().await?;
    }

    let app = api::router(state);

    // Start server
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app).await.map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
