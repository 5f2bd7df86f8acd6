// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub body: BodyConfig,
    pub assets: AssetsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Build mode switch, read from `app.mode` (or `NODE_ENV`)
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(from = "String")]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl From<String> for BuildMode {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// Application-wide switches
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub mode: BuildMode,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Access log format (dev, combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_access_log_format() -> String {
    "dev".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Hard cap on any request body the transport will buffer
    pub max_body_size: u64,
}

/// Cross-origin policy
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
}

/// Rate limiter settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub max: u32,
    pub window_secs: u64,
    /// Only paths under this prefix are counted
    pub scope: String,
    pub message: String,
}

/// Body parser limits
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BodyConfig {
    pub json_limit: usize,
    pub form_limit: usize,
}

/// Static asset roots
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetsConfig {
    /// Directory that holds `bootstrap/`, `text/`, `views/` and `public/`
    pub root: String,
}

/// Database connection settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Connection string; may contain a `<PASSWORD>` placeholder
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
