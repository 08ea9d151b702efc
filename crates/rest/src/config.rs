//! Server configuration for the NovaBase API.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NOVABASE_SERVER_PORT` | 8000 | Server port |
//! | `NOVABASE_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `NOVABASE_LOG_LEVEL` | info | Log level |
//! | `NOVABASE_MAX_BODY_SIZE` | 5242880 | Max request body (bytes) |
//! | `NOVABASE_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `NOVABASE_ENABLE_CORS` | true | Enable CORS |
//! | `NOVABASE_CORS_ORIGINS` | * | Allowed origins |
//! | `NOVABASE_CORS_METHODS` | GET,POST,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `NOVABASE_CORS_HEADERS` | Content-Type,Authorization,Accept | Allowed headers |
//! | `NOVABASE_DATABASE_URL` | `novabase.db` (SQLite) | `postgres://...`, `sqlite://path` or a SQLite path |
//! | `NOVABASE_JWT_SECRET` | | HMAC secret for bearer tokens |
//! | `NOVABASE_RATE_LIMIT` | 100 | Requests per client per window |
//! | `NOVABASE_RATE_LIMIT_WINDOW` | 60 | Rate limit window (seconds) |
//! | `NOVABASE_TRUST_FORWARDED_FOR` | false | Key rate limits by `X-Forwarded-For` |
//! | `NOVABASE_EXPOSE_TABLES` | | Tables to register at startup (comma-separated) |
//!
//! # Example
//!
//! ```rust
//! use novabase_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     jwt_secret: "change-me".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;

const DEFAULT_CORS_METHODS: &str = "GET,POST,PATCH,DELETE,OPTIONS";
const DEFAULT_CORS_HEADERS: &str = "Content-Type,Authorization,Accept";

/// Server configuration for the NovaBase API.
///
/// This struct can be constructed from environment variables using [`ServerConfig::from_env`],
/// from command line arguments using [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "novabase")]
#[command(about = "Multi-tenant generic table API")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "NOVABASE_SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "NOVABASE_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "NOVABASE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "NOVABASE_MAX_BODY_SIZE", default_value = "5242880")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "NOVABASE_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "NOVABASE_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "NOVABASE_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "NOVABASE_CORS_METHODS", default_value = DEFAULT_CORS_METHODS)]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(long, env = "NOVABASE_CORS_HEADERS", default_value = DEFAULT_CORS_HEADERS)]
    pub cors_headers: String,

    /// Store connection string. `postgres://...` selects PostgreSQL,
    /// `sqlite://path` or a bare path selects SQLite, unset means in-memory SQLite.
    #[arg(long, env = "NOVABASE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// HMAC secret used to verify bearer tokens.
    #[arg(long, env = "NOVABASE_JWT_SECRET", default_value = "", hide_env_values = true)]
    pub jwt_secret: String,

    /// Requests allowed per client within one rate-limit window.
    #[arg(long, env = "NOVABASE_RATE_LIMIT", default_value = "100")]
    pub rate_limit: usize,

    /// Rate-limit window in seconds.
    #[arg(long, env = "NOVABASE_RATE_LIMIT_WINDOW", default_value = "60")]
    pub rate_limit_window: u64,

    /// Key rate limits by the first `X-Forwarded-For` address.
    /// Enable only behind a proxy that overwrites the header.
    #[arg(long, env = "NOVABASE_TRUST_FORWARDED_FOR", default_value = "false")]
    pub trust_forwarded_for: bool,

    /// Tables to register and expose at startup (comma-separated).
    #[arg(long, env = "NOVABASE_EXPOSE_TABLES", value_delimiter = ',')]
    pub expose_tables: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 5 * 1024 * 1024, // 5MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: DEFAULT_CORS_METHODS.to_string(),
            cors_headers: DEFAULT_CORS_HEADERS.to_string(),
            database_url: None,
            jwt_secret: String::new(),
            rate_limit: 100,
            rate_limit_window: 60,
            trust_forwarded_for: false,
            expose_tables: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables without
    /// requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse_from(["novabase"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the configured table names, trimmed, without empty entries.
    pub fn exposed_tables(&self) -> impl Iterator<Item = &str> {
        self.expose_tables
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.jwt_secret.is_empty() {
            errors.push("JWT secret must be set".to_string());
        }

        if self.rate_limit == 0 {
            errors.push("Rate limit cannot be 0".to_string());
        }

        if self.rate_limit_window == 0 {
            errors.push("Rate limit window cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// This uses ephemeral port 0, a fixed JWT secret and a rate limit high
    /// enough not to interfere with tests.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            log_level: "debug".to_string(),
            request_timeout: 5, // Shorter timeout for tests
            enable_cors: false,
            jwt_secret: "test-secret".to_string(),
            rate_limit: 10_000,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_body_size, 5 * 1024 * 1024);
        assert_eq!(config.rate_limit, 100);
        assert_eq!(config.rate_limit_window, 60);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 3000,
            host: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = ServerConfig::default();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("JWT")));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = ServerConfig {
            port: 0,
            max_body_size: 0,
            rate_limit: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_parse_expose_tables() {
        let config =
            ServerConfig::try_parse_from(["novabase", "--expose-tables", "notes, projects,,"])
                .unwrap();
        let tables: Vec<&str> = config.exposed_tables().collect();
        assert_eq!(tables, vec!["notes", "projects"]);
    }

    #[test]
    fn test_for_testing() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.port, 0);
        assert!(!config.enable_cors);
        assert!(!config.jwt_secret.is_empty());
    }
}
