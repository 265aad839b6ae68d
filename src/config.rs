//! Configuration management for Labbook server

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsersConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    /// Administrator account created at startup
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// When set, logs are also written to daily-rolling files in this directory
    pub directory: Option<String>,
}

/// Largest single credit allocation any deployment may configure
pub const ALLOCATION_CEILING: i64 = 10_000;

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Weekdays on which nothing can be booked (0=Monday, 6=Sunday)
    pub closed_weekdays: Vec<i16>,
    /// Upper bound of a single credit allocation, at most `ALLOCATION_CEILING`
    pub max_allocation: Decimal,
}

impl BookingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_allocation <= Decimal::ZERO || self.max_allocation > Decimal::from(ALLOCATION_CEILING) {
            return Err(ConfigError::Message(format!(
                "booking.max_allocation must be in (0, {}], got {}",
                ALLOCATION_CEILING, self.max_allocation
            )));
        }
        if let Some(day) = self.closed_weekdays.iter().find(|d| !(0..=6).contains(*d)) {
            return Err(ConfigError::Message(format!(
                "booking.closed_weekdays holds {}, expected 0 (Monday) to 6 (Sunday)",
                day
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub users: UsersConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub booking: BookingConfig,
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
            // Add environment variables (with prefix LABBOOK_)
            .add_source(
                Environment::with_prefix("LABBOOK")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override JWT secret from JWT_SECRET env var if present
            .set_override_option(
                "users.jwt_secret",
                env::var("JWT_SECRET").ok(),
            )?
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.booking.validate()?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
            jwt_expiration_hours: 24,
            admin_email: "admin@labbook.local".to_string(),
            admin_password: "admin123".to_string(),
            admin_name: "Administrator".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            closed_weekdays: vec![5, 6],
            max_allocation: Decimal::from(10_000),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            users: UsersConfig::default(),
            logging: LoggingConfig::default(),
            booking: BookingConfig::default(),
        }
    }
}
