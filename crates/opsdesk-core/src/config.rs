//! Configuration loading and typed config structures for the Opsdesk server.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults (every field has one).
//! 2. An optional YAML file: `opsdesk.yaml` in the working directory, or
//!    the path named by `OPSDESK_CONFIG` (which must then exist).
//! 3. `OPSDESK__<SECTION>__<KEY>` environment variables, e.g.
//!    `OPSDESK__SERVER__PORT=9000`.
//! 4. The conventional `DATABASE_URL`, `JWT_SECRET` and `PORT` variables.

use std::path::Path;

use serde::Deserialize;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "OPSDESK_CONFIG";

/// Secret used when none is configured. Fine for local development only.
pub const DEV_JWT_SECRET: &str = "opsdesk-dev-secret-change-me";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load configuration: {source}")]
    Load {
        /// The underlying `config` crate error.
        #[from]
        source: config::ConfigError,
    },

    /// The merged configuration is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Document store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Password hashing, tokens, and the bootstrap admin account.
    #[serde(default)]
    pub auth: AuthConfig,

    /// List endpoint paging limits.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source is malformed, or
    /// [`ConfigError::Invalid`] if the merged result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let mut config = Self::from_sources(explicit.as_deref().map(Path::new))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the string is not valid YAML or does
    /// not match the expected shape.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn from_sources(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("opsdesk").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("OPSDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Apply the conventional `DATABASE_URL`, `JWT_SECRET` and `PORT`
    /// overrides using `lookup` to read variables.
    ///
    /// Setting `DATABASE_URL` also selects the `PostgreSQL` backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = url;
            self.database.backend = DatabaseBackend::Postgres;
        }
        if let Some(secret) = lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.jwt_secret = secret;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid(format!("PORT is not a valid port ({e}): {port}"))
                })?;
        }
        Ok(())
    }

    /// Reject combinations the server cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Invalid(
                "database.url is required for the postgres backend".to_owned(),
            ));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".to_owned()));
        }
        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_hours must be at least 1".to_owned(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::Invalid(
                "pagination.default_limit must be between 1 and pagination.max_limit".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whether the development JWT secret is still in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// In-process store; data is lost on restart.
    #[default]
    Memory,
    /// `PostgreSQL` `JSONB` store.
    Postgres,
}

/// Document store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// `PostgreSQL` connection URL (postgres backend only).
    #[serde(default)]
    pub url: String,

    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Run embedded migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: String::new(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            run_migrations: true,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing bearer tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,

    /// Argon2 memory cost in KiB.
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,

    /// Argon2 iteration count.
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,

    /// Email of the admin account created at startup when absent.
    #[serde(default)]
    pub admin_email: Option<String>,

    /// Password of the bootstrap admin account.
    #[serde(default)]
    pub admin_password: Option<String>,

    /// Display name of the bootstrap admin account.
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            hash_memory_kib: default_hash_memory_kib(),
            hash_iterations: default_hash_iterations(),
            admin_email: None,
            admin_password: None,
            admin_name: default_admin_name(),
        }
    }
}

/// List endpoint paging limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the request gives none.
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_owned()
}

const fn default_token_ttl_hours() -> u32 {
    720
}

const fn default_hash_memory_kib() -> u32 {
    19_456
}

const fn default_hash_iterations() -> u32 {
    2
}

fn default_admin_name() -> String {
    "Administrator".to_owned()
}

const fn default_page_limit() -> u64 {
    10
}

const fn default_max_page_limit() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.pagination.max_limit, 100);
        assert!(config.uses_dev_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
server:
  port: 8080
database:
  backend: postgres
  url: postgresql://opsdesk@localhost/opsdesk
  run_migrations: false
auth:
  admin_email: root@example.com
  admin_password: hunter22
logging:
  json: true
";
        let config = AppConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.backend, DatabaseBackend::Postgres);
        assert!(!config.database.run_migrations);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.admin_email.as_deref(), Some("root@example.com"));
        assert_eq!(config.auth.admin_name, "Administrator");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        let config = AppConfig::parse("");
        assert_eq!(config.ok(), Some(AppConfig::default()));
    }

    #[test]
    fn overrides_take_precedence() {
        let vars = BTreeMap::from([
            ("DATABASE_URL", "postgresql://db/opsdesk"),
            ("JWT_SECRET", "s3cret"),
            ("PORT", "9001"),
        ]);
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| vars.get(key).map(|v| (*v).to_owned()));
        assert!(result.is_ok());
        assert_eq!(config.database.backend, DatabaseBackend::Postgres);
        assert_eq!(config.database.url, "postgresql://db/opsdesk");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.server.port, 9001);
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == "PORT").then(|| "http".to_owned()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn postgres_without_url_is_invalid() {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Postgres;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn default_limit_above_max_is_invalid() {
        let mut config = AppConfig::default();
        config.pagination.default_limit = 500;
        assert!(config.validate().is_err());
    }
}
