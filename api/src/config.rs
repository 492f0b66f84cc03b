use crate::database::DEFAULT_DATABASE_URL;
use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Outbound email settings. Notifications are disabled without them.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    /// RFC 2822 sender, e.g. `Lingua <noreply@example.com>`
    pub from: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub environment: String,
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `PORT`, `ENVIRONMENT` and the optional
    /// `EMAIL_API_KEY` / `EMAIL_FROM` / `EMAIL_API_URL` triple.
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let email = match (non_empty_var("EMAIL_API_KEY"), non_empty_var("EMAIL_FROM")) {
            (Some(api_key), Some(from)) => Some(EmailConfig {
                api_url: non_empty_var("EMAIL_API_URL")
                    .unwrap_or_else(|| email_utils::MAILCHANNELS_API_URL.to_string()),
                api_key,
                from,
            }),
            (Some(_), None) => {
                tracing::warn!("EMAIL_API_KEY is set but EMAIL_FROM is not; email notifications disabled");
                None
            }
            _ => None,
        };

        Ok(Self {
            database_url: non_empty_var("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port,
            environment: non_empty_var("ENVIRONMENT")
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            email,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "DATABASE_URL",
        "PORT",
        "ENVIRONMENT",
        "EMAIL_API_URL",
        "EMAIL_API_KEY",
        "EMAIL_FROM",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");
        assert_eq!(config.email, None);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("PORT", "9090");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("EMAIL_API_KEY", "key-123");
        env::set_var("EMAIL_FROM", "Lingua <noreply@example.com>");

        let config = AppConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 9090);
        assert_eq!(config.environment, "production");
        let email = config.email.unwrap();
        assert_eq!(email.api_url, email_utils::MAILCHANNELS_API_URL);
        assert_eq!(email.api_key, "key-123");
        assert_eq!(email.from, "Lingua <noreply@example.com>");
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_an_error() {
        clear_env();
        env::set_var("PORT", "eighty");
        let result = AppConfig::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_email_requires_sender() {
        clear_env();
        env::set_var("EMAIL_API_KEY", "key-123");
        let config = AppConfig::from_env().unwrap();
        clear_env();
        assert_eq!(config.email, None);
    }
}
