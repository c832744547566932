use anime_catalog::{
    AppState,
    auth::ensure_user,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects and migrates the
/// database, seeds bootstrap accounts and serves the HTTP API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request summaries from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "anime_catalog=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres) and schema migrations.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to connect to Postgres"))?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Bootstrap accounts listed in BOOTSTRAP_USERS.
    for user in &config.bootstrap_users {
        ensure_user(&repo, &user.username, &user.password, &user.roles).await?;
    }

    // 6. Router and Server Startup
    let app = create_router(AppState::new(repo));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
