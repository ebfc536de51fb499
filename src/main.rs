use record_portal::{
    AppState,
    accounts::{AccountService, AccountsState},
    config::{AppConfig, Env},
    create_router,
    credential::{Argon2Protector, ProtectorState},
    models::{CreateUserRequest, ROLE_ADMIN, ROLE_USER},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Asynchronous entry point: initializes configuration, logging, the
/// database pool (running pending migrations), the account service, and the
/// HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup: RUST_LOG wins, with sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "record_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize logging based on environment.
    match config.env {
        Env::Local => {
            // LOCAL: pretty print for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres) and schema migration.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Identity & access core: injected credential protector + account service.
    let protector = Arc::new(Argon2Protector::new()) as ProtectorState;
    let accounts = Arc::new(AccountService::new(repo.clone(), protector)) as AccountsState;

    // LOCAL-ONLY: seed the well-known roles and a default administrator so a
    // fresh development database is immediately usable. `create_user_if_absent`
    // makes this safe to run on every startup.
    if config.env == Env::Local {
        accounts
            .ensure_role(ROLE_USER)
            .await
            .expect("FATAL: Failed to seed default role.");
        accounts
            .ensure_role(ROLE_ADMIN)
            .await
            .expect("FATAL: Failed to seed admin role.");
        let admin = accounts
            .create_user_if_absent(CreateUserRequest {
                username: "admin".to_string(),
                password: "admin-local-password".to_string(),
                roles: vec![ROLE_ADMIN.to_string()],
            })
            .await
            .expect("FATAL: Failed to seed default administrator.");
        tracing::info!(id = %admin.id, "local administrator account available");
    }

    // 6. Unified state assembly.
    let app_state = AppState {
        accounts,
        repo,
        config,
    };

    // 7. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
