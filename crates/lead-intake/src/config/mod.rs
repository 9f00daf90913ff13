use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEVELOPMENT_ADMIN_KEY: &str = "123456";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub webhook: WebhookConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_api_key = match env::var("ADMIN_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingAdminKey)
            }
            _ => DEVELOPMENT_ADMIN_KEY.to_string(),
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let security = SecurityConfig {
            admin_api_key,
            cors_origins,
            max_login_attempts: parse_var("LOGIN_MAX_ATTEMPTS", 5)?,
            lockout: Duration::from_secs(parse_var("LOGIN_LOCKOUT_SECS", 900)?),
            trust_forwarded_for: parse_var("TRUST_PROXY_HEADERS", false)?,
        };

        let storage = StorageConfig {
            fund_config_path: PathBuf::from(
                env::var("FUND_CONFIG_PATH").unwrap_or_else(|_| "fundos_criterios.json".to_string()),
            ),
            static_dir: PathBuf::from(
                env::var("STATIC_DIR").unwrap_or_else(|_| "/app/static".to_string()),
            ),
        };

        let webhook = WebhookConfig {
            secret: env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),
            timeout: Duration::from_secs(parse_var("WEBHOOK_TIMEOUT_SECS", 10)?),
            log_capacity: parse_var("WEBHOOK_LOG_CAPACITY", 100)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            security,
            storage,
            webhook,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Admin authentication and browser access policy.
#[derive(Clone)]
pub struct SecurityConfig {
    pub admin_api_key: String,
    pub cors_origins: Vec<String>,
    pub max_login_attempts: u32,
    pub lockout: Duration,
    /// Key login attempts on `X-Forwarded-For`; only safe behind a proxy that sets it.
    pub trust_forwarded_for: bool,
}

impl SecurityConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("admin_api_key", &"<redacted>")
            .field("cors_origins", &self.cors_origins)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("lockout", &self.lockout)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}

/// Locations of the fund configuration document and the built frontend.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub fund_config_path: PathBuf,
    pub static_dir: PathBuf,
}

/// Outbound webhook delivery settings.
#[derive(Clone)]
pub struct WebhookConfig {
    pub secret: Option<String>,
    pub timeout: Duration,
    pub log_capacity: usize,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("log_capacity", &self.log_capacity)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    MissingAdminKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} has an invalid value")
            }
            ConfigError::MissingAdminKey => {
                write!(f, "ADMIN_API_KEY must be set when APP_ENV is production")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingAdminKey => None,
        }
    }
}
