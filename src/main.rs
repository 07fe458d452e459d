use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tenantmanager::auth::TokenService;
use tenantmanager::configuration::get_configuration;
use tenantmanager::maintenance::{ListingCache, PgMaintenanceRepository};
use tenantmanager::session::RedisStore;
use tenantmanager::startup::{run, AppServices};
use tenantmanager::telemetry::init_telemetry;
use tenantmanager::users::{seed_users, PgUserStore};

fn startup_error(kind: std::io::ErrorKind, what: &str, e: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %e, "{}", what);
    std::io::Error::new(kind, format!("{}: {}", what, e))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration()
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Failed to read configuration", e))?;
    tracing::info!("Configuration loaded successfully");

    let tokens = TokenService::new(&configuration.jwt)
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid JWT settings", e))?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::ConnectionRefused, "Failed to create connection pool", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::Other, "Failed to run migrations", e))?;
    tracing::info!("Database ready");

    let store = RedisStore::connect(&configuration.redis.url)
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::ConnectionRefused, "Failed to connect to Redis", e))?;
    tracing::info!("Session store connected");

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let seeded = seed_users(users.as_ref(), &configuration.seed_users)
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::Other, "Failed to seed users", e))?;
    if seeded > 0 {
        tracing::info!(count = seeded, "Seed users created");
    }

    let services = AppServices::new(
        users,
        Arc::new(PgMaintenanceRepository::new(pool)),
        Arc::new(store),
        tokens,
        configuration.session.ttl(),
        ListingCache::new(configuration.cache.max_entries),
    );

    let address = format!("{}:{}", configuration.application.host, configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, services)?.await
}
