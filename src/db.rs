use crate::config::{AppConfig, PoolSettings};
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Instant;
use tracing::{debug, error, info};

pub type DbPool = DatabaseConnection;

/// In-memory SQLite lives per connection, so its pool is pinned to one.
fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}

/// Connects with default pool settings.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    connect(database_url, &PoolSettings::default()).await
}

/// Connects using the URL and `pool` section of the application config.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    connect(&cfg.database_url, &cfg.pool).await
}

/// Opens the pool; an unreachable database is a `DependencyError`.
pub async fn connect(database_url: &str, pool: &PoolSettings) -> Result<DbPool, ServiceError> {
    let (max, min) = if is_sqlite_memory(database_url) {
        (1, 1)
    } else {
        (pool.max_connections, pool.min_connections)
    };
    debug!(max, min, ?pool, "opening database pool");

    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(max)
        .min_connections(min)
        .connect_timeout(pool.connect_timeout())
        .acquire_timeout(pool.acquire_timeout())
        .idle_timeout(pool.idle_timeout())
        .sqlx_logging(false);

    let db = Database::connect(options).await.map_err(|e| {
        error!(error = %e, "could not open database pool");
        ServiceError::DependencyError(format!("database connection failed: {}", e))
    })?;

    gauge!("firecrm_db.max_connections", max as f64);
    info!(max_connections = max, "database pool ready");
    Ok(db)
}

/// Applies every pending embedded migration.
pub async fn run_migrations(db: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match crate::migrator::Migrator::up(db, None).await {
        Ok(()) => {
            info!(elapsed = ?started.elapsed(), "migrations applied");
            Ok(())
        }
        Err(e) => {
            error!(elapsed = ?started.elapsed(), error = %e, "migrations failed");
            Err(ServiceError::DatabaseError(e))
        }
    }
}

/// Round-trips a ping; used by `/health`.
pub async fn check_connection(db: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match db.ping().await {
        Ok(()) => {
            let elapsed = started.elapsed();
            debug!(?elapsed, "database ping ok");
            gauge!("firecrm_db.ping_ms", elapsed.as_millis() as f64);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "database ping failed");
            counter!("firecrm_db.ping_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

pub async fn close_pool(db: DbPool) -> Result<(), ServiceError> {
    info!("closing database pool");
    db.close().await.map_err(ServiceError::DatabaseError)
}
