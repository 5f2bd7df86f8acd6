// Configuration module entry point
// Loads configuration from config.toml, config.env and the environment

mod state;
mod types;

use std::net::SocketAddr;

use config::builder::DefaultState;
use config::ConfigBuilder;

use crate::error::StartupError;

// Re-export public types
pub use state::AppState;
pub use types::{
    AppConfig, AssetsConfig, BodyConfig, BuildMode, Config, CorsConfig, DatabaseConfig,
    HttpConfig, LoggingConfig, PerformanceConfig, RateLimitConfig, ServerConfig,
};

/// Dotenv file read before the environment is consulted
const DOTENV_FILE: &str = "config.env";

/// Placeholder replaced by the database password in the connection string
const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";

impl Config {
    /// Load configuration from "config.toml" and the environment
    pub fn load() -> Result<Self, StartupError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence, lowest first: built-in defaults, the config file,
    /// `STOREFRONT_*` variables, then the plain `PORT`, `NODE_ENV`,
    /// `DATABASE` and `DATABASE_PASSWORD` variables.
    pub fn load_from(config_path: &str) -> Result<Self, StartupError> {
        load_dotenv();

        let settings = base_builder(config_path)?
            .add_source(
                config::Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("app.mode", std::env::var("NODE_ENV").ok())?
            .set_override_option("database.url", std::env::var("DATABASE").ok())?
            .set_override_option(
                "database.password",
                std::env::var("DATABASE_PASSWORD").ok(),
            )?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| StartupError::Address(format!("{}:{}: {e}", self.server.host, self.server.port)))
    }

    /// Connection string with the password substituted in
    pub fn database_url(&self) -> Option<String> {
        self.database.url.as_deref().map(|url| {
            resolve_database_url(url, self.database.password.as_deref().unwrap_or_default())
        })
    }

    /// Connection string safe to print
    pub fn masked_database_url(&self) -> Option<String> {
        self.database
            .url
            .as_deref()
            .map(|url| resolve_database_url(url, "****"))
    }
}

fn resolve_database_url(url: &str, password: &str) -> String {
    url.replace(PASSWORD_PLACEHOLDER, password)
}

fn load_dotenv() {
    if let Err(e) = dotenvy::from_filename(DOTENV_FILE) {
        if !e.not_found() {
            crate::logger::log_warning(&format!("Failed to read {DOTENV_FILE}: {e}"));
        }
    }
}

/// Defaults plus the optional config file, without any environment input
fn base_builder(config_path: &str) -> Result<ConfigBuilder<DefaultState>, StartupError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("app.mode", "production")?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log_format", "dev")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("http.server_name", "Storefront/0.1")?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("cors.origins", vec!["https://ptstore.vercel.app/"])?
        .set_default("cors.methods", vec!["GET", "POST", "PUT", "DELETE", "PATCH"])?
        .set_default("cors.allowed_headers", vec!["Content-Type", "Authorization"])?
        .set_default("cors.exposed_headers", vec!["Authorization"])?
        .set_default("cors.credentials", true)?
        .set_default("rate_limit.max", 1000)?
        .set_default("rate_limit.window_secs", 3600)?
        .set_default("rate_limit.scope", "/api")?
        .set_default(
            "rate_limit.message",
            "Too many requests from this IP, please try again in an hour!",
        )?
        .set_default("body.json_limit", 102_400)? // 100KB
        .set_default("body.form_limit", 102_400)?
        .set_default("assets.root", ".")?;
    Ok(builder)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    base_builder("does-not-exist")
        .and_then(|b| Ok(b.build()?))
        .and_then(|c| Ok(c.try_deserialize()?))
        .expect("default configuration must deserialize")
}
