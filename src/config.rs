use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, path::Path, time::Duration};
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const FALLBACK_RUN_ENV: &str = "development";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const DEV_DEFAULT_JWT_SECRET: &str = "development_only_secret_for_local_field_service_testing";

/// Settings for the whole service, read by [`load_config`].
///
/// Every field except `jwt_secret` has a usable default, so a bare
/// `APP__JWT_SECRET` is enough to start a development server.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database_url: String,

    /// HS256 key for bearer tokens
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    pub host: String,
    pub port: u16,

    /// `development` relaxes CORS; anything else is treated as a deployment
    pub environment: String,

    #[validate(custom = "validate_log_level")]
    pub log_level: String,
    pub log_json: bool,

    /// Export spans over OTLP; `OTEL_EXPORTER_OTLP_ENDPOINT` also turns this on
    pub otel_enabled: bool,

    /// Apply pending migrations before serving
    pub auto_migrate: bool,

    /// Attachment root for the local file store
    pub upload_dir: String,
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    /// Bound of the domain event queue
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Comma-separated origins; wins over every other CORS setting
    pub cors_allowed_origins: Option<String>,
    pub cors_allow_any_origin: bool,
    pub cors_allow_credentials: bool,

    pub pool: PoolSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://firecrm.db?mode=rwc".to_string(),
            jwt_secret: String::new(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: FALLBACK_RUN_ENV.to_string(),
            log_level: "info".to_string(),
            log_json: false,
            otel_enabled: false,
            auto_migrate: false,
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            event_channel_capacity: 1024,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool sizing and timeouts, under `pool.*` / `APP__POOL__*`
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 16,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 8,
        }
    }
}

impl PoolSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl AppConfig {
    /// Defaults plus the values a caller always has to decide on.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            host,
            port,
            environment,
            ..Self::default()
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_origins().next().is_some()
    }

    /// Configured origins, trimmed, blanks skipped
    pub fn cors_origins(&self) -> impl Iterator<Item = &str> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
    }

    /// Permissive CORS is acceptable in development or when explicitly requested.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Cross-field rules the derive cannot express.
    fn check_deployment_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            errors.add(
                "cors_allowed_origins",
                rule_violation(
                    "cors_origins_missing",
                    "Deployments need APP__CORS_ALLOWED_ORIGINS, or APP__CORS_ALLOW_ANY_ORIGIN=true to opt out",
                ),
            );
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            errors.add(
                "jwt_secret",
                rule_violation(
                    "jwt_secret_is_dev_default",
                    "The bundled development secret is only accepted in development",
                ),
            );
        }

        if self.pool.min_connections > self.pool.max_connections {
            errors.add(
                "pool",
                rule_violation(
                    "pool_bounds",
                    "pool.min_connections is larger than pool.max_connections",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn rule_violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(rule_violation(
            "log_level",
            "expected one of trace, debug, info, warn, error",
        ))
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not read configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Reads the configuration from, lowest precedence first:
/// built-in defaults, `config/default.toml`, `config/<RUN_ENV>.toml`,
/// then `APP__*` environment variables (`APP__POOL__MAX_CONNECTIONS` for
/// nested keys).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| FALLBACK_RUN_ENV.to_string());
    info!(%run_env, "loading configuration");

    if !Path::new(CONFIG_DIR).is_dir() {
        info!("no '{}' directory; using defaults and environment", CONFIG_DIR);
    }

    let layered = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let cfg: AppConfig = layered.try_deserialize()?;
    if cfg.jwt_secret.is_empty() {
        error!("APP__JWT_SECRET is not set");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret".to_string(),
        )));
    }

    if let Err(e) = cfg.validate().and_then(|_| cfg.check_deployment_rules()) {
        error!(errors = %e, "configuration rejected");
        return Err(e.into());
    }

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Installs the global subscriber. `RUST_LOG` replaces the default
/// `firecrm_api=<level>,tower_http=debug` filter when set.
pub fn init_tracing(level: &str, json: bool, otel: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| format!("firecrm_api={},tower_http=debug", level));

    let tracer = if otel || env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        match otlp_tracer() {
            Ok(tracer) => Some(tracer),
            Err(err) => {
                eprintln!("OTLP export disabled: {}", err);
                None
            }
        }
    } else {
        None
    };

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)));

    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}

fn otlp_tracer() -> Result<opentelemetry_sdk::trace::Tracer, opentelemetry::trace::TraceError> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());
    let service = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "firecrm-api".to_string());

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::config().with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                service,
            )])),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}
