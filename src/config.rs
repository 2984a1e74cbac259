//! Configuration from environment variables.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logger: LoggerConfig,
    pub orders: OrderConfig,
}

impl Config {
    /// Loads every section from the environment. Unset or unparseable
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig::from_env(),
            logger: LoggerConfig::from_env(),
            orders: OrderConfig::from_env(),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "commerce".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: full connection string (overrides the rest)
    /// - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSL_MODE`
    /// - `DB_MAX_CONNECTIONS`: pool size (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            host: env::var("DB_HOST").unwrap_or(defaults.host),
            port: parsed("DB_PORT").unwrap_or(defaults.port),
            user: env::var("DB_USER").unwrap_or(defaults.user),
            password: env::var("DB_PASSWORD").unwrap_or(defaults.password),
            name: env::var("DB_NAME").unwrap_or(defaults.name),
            ssl_mode: env::var("DB_SSL_MODE").unwrap_or(defaults.ssl_mode),
            max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
        }
    }

    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                self.user, self.password, self.host, self.port, self.name, self.ssl_mode
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Filter directive used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    pub level: String,
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggerConfig {
    /// Reads `LOG_LEVEL` and `LOG_JSON`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("LOG_LEVEL").unwrap_or(defaults.level),
            json: flag("LOG_JSON").unwrap_or(defaults.json),
        }
    }
}

/// Order workflow tuning.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Upper bound for one workflow operation, including its transaction.
    pub operation_timeout: Duration,
    pub default_per_page: i64,
    pub max_per_page: i64,
    /// Add the quantities of deleted order items back to product stock.
    pub restore_stock_on_delete: bool,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            default_per_page: 10,
            max_per_page: 100,
            restore_stock_on_delete: false,
        }
    }
}

impl OrderConfig {
    /// Reads `ORDER_TIMEOUT_SECS`, `ORDER_DEFAULT_PER_PAGE`, `ORDER_MAX_PER_PAGE`
    /// and `ORDER_RESTORE_STOCK_ON_DELETE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            operation_timeout: parsed::<u64>("ORDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.operation_timeout),
            default_per_page: parsed("ORDER_DEFAULT_PER_PAGE")
                .filter(|v: &i64| *v > 0)
                .unwrap_or(defaults.default_per_page),
            max_per_page: parsed("ORDER_MAX_PER_PAGE")
                .filter(|v: &i64| *v > 0)
                .unwrap_or(defaults.max_per_page),
            restore_stock_on_delete: flag("ORDER_RESTORE_STOCK_ON_DELETE")
                .unwrap_or(defaults.restore_stock_on_delete),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}
