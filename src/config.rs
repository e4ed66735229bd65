//! Configuration management for the gear tracker server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Minimum length of the token signing secret, in bytes
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment ("development", "production", ...)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServerConfig {
    /// Development mode exposes internal error details in responses
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Token signing secret. Must be supplied externally.
    pub jwt_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_verification_ttl_hours")]
    pub verification_ttl_hours: i64,
    #[serde(default = "default_reset_ttl_minutes")]
    pub reset_ttl_minutes: i64,
    /// Mark new accounts as verified at registration (test deployments)
    #[serde(default)]
    pub auto_verify: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// When disabled, outgoing mail is logged instead of delivered
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_from_name: Option<String>,
    pub smtp_use_tls: bool,
    /// Base URL of the web client, used to build links in emails
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; the weather service is disabled without it
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    /// Directory where uploaded images are written
    pub dir: String,
    /// URL prefix under which `dir` is served
    pub public_path: String,
    pub max_files: usize,
    pub max_file_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (GEAR__SECTION__KEY)
            .add_source(
                Environment::with_prefix("GEAR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("weather.api_key", env::var("OPENWEATHER_API_KEY").ok())?
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Message(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if self.auth.session_ttl_hours <= 0
            || self.auth.verification_ttl_hours <= 0
            || self.auth.reset_ttl_minutes <= 0
        {
            return Err(ConfigError::Message(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.uploads.max_files == 0 || self.uploads.max_file_bytes == 0 {
            return Err(ConfigError::Message(
                "uploads.max_files and uploads.max_file_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_verification_ttl_hours() -> i64 {
    24
}

fn default_reset_ttl_minutes() -> i64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: default_environment(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://gear.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@gear-tracker.local".to_string(),
            smtp_from_name: Some("Windsurf Gear Tracker".to_string()),
            smtp_use_tls: true,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            public_path: "/uploads".to_string(),
            max_files: 5,
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}
