//! Central module for application-wide configuration settings.
//!
//! This module handles loading and validating configuration parameters such as
//! the identity store location, token signing secret, hashing cost and server
//! port. Missing or malformed required values abort startup.

use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

/// Minimum length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Where identity partitions are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Hosted store reached through its REST query API.
    Rest {
        url: String,
        api_key: String,
        timeout_seconds: u64,
    },
    /// Local SQLite database.
    Sqlite {
        database_url: String,
        max_connections: u32,
        acquire_timeout_seconds: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// First administrator created at startup when no account holds its email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub family_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub jwt_secret: String,
    pub jwt_expires_in_seconds: u64,
    pub bcrypt_cost: u32,
    pub server_port: u16,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub allow_privileged_signup: bool,
    pub admin_bootstrap: Option<AdminBootstrap>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "rest".to_string());

        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "rest" => StoreConfig::Rest {
                url: required(&lookup, "STORE_URL")?
                    .trim_end_matches('/')
                    .to_string(),
                api_key: required(&lookup, "STORE_API_KEY")?,
                timeout_seconds: parse_or(&lookup, "STORE_TIMEOUT_SECONDS", 10)?,
            },
            "sqlite" => StoreConfig::Sqlite {
                database_url: required(&lookup, "DATABASE_URL")?,
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
                acquire_timeout_seconds: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3)?,
            },
            other => bail!("STORE_BACKEND must be 'rest' or 'sqlite', got '{}'", other),
        };

        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} bytes", MIN_JWT_SECRET_LEN);
        }

        let jwt_expires_in_seconds: u64 = parse_or(&lookup, "JWT_EXPIRES_IN_SECONDS", 86_400)?;
        if jwt_expires_in_seconds == 0 {
            bail!("JWT_EXPIRES_IN_SECONDS must be greater than zero");
        }

        let bcrypt_cost: u32 = parse_or(&lookup, "BCRYPT_COST", 10)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }

        let server_port = parse_or(&lookup, "SERVER_PORT", 3000)?;

        let app_env = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some("development") | Some("dev") => AppEnv::Development,
            Some("production") | Some("prod") | None | Some("") => AppEnv::Production,
            Some(other) => bail!("APP_ENV must be 'development' or 'production', got '{}'", other),
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let allow_privileged_signup = match lookup("ALLOW_PRIVILEGED_SIGNUP") {
            Some(value) => parse_bool(&value)
                .context("ALLOW_PRIVILEGED_SIGNUP must be true or false")?,
            None => false,
        };

        let admin_bootstrap = match (
            present(&lookup, "ADMIN_BOOTSTRAP_EMAIL"),
            present(&lookup, "ADMIN_BOOTSTRAP_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password,
                display_name: present(&lookup, "ADMIN_BOOTSTRAP_DISPLAY_NAME")
                    .unwrap_or_else(|| "Admin".to_string()),
                family_name: present(&lookup, "ADMIN_BOOTSTRAP_FAMILY_NAME")
                    .unwrap_or_else(|| "System".to_string()),
            }),
            (None, None) => None,
            _ => bail!("ADMIN_BOOTSTRAP_EMAIL and ADMIN_BOOTSTRAP_PASSWORD must be set together"),
        };

        Ok(Config {
            store,
            jwt_secret,
            jwt_expires_in_seconds,
            bcrypt_cost,
            server_port,
            app_env,
            cors_allowed_origins,
            allow_privileged_signup,
            admin_bootstrap,
        })
    }

    /// Whether internal error detail may be returned to callers.
    pub fn diagnostics_enabled(&self) -> bool {
        self.app_env == AppEnv::Development
    }
}

fn present<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    present(lookup, key).with_context(|| format!("{} not set", key))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("invalid boolean '{}'", other),
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        store: StoreConfig::Sqlite {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
        },
        jwt_secret: "test-signing-secret-with-enough-entropy-0123456789".to_string(),
        jwt_expires_in_seconds: 86_400,
        bcrypt_cost: 4,
        server_port: 0,
        app_env: AppEnv::Production,
        cors_allowed_origins: Vec::new(),
        allow_privileged_signup: false,
        admin_bootstrap: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_rest_backend_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_URL", "https://store.example.test/"),
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Rest {
                url: "https://store.example.test".to_string(),
                api_key: "service-key".to_string(),
                timeout_seconds: 10,
            }
        );
        assert_eq!(config.jwt_expires_in_seconds, 86_400);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.app_env, AppEnv::Production);
        assert!(!config.diagnostics_enabled());
        assert!(config.cors_allowed_origins.is_empty());
        assert!(!config.allow_privileged_signup);
        assert!(config.admin_bootstrap.is_none());
    }

    #[test]
    fn test_admin_bootstrap() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_URL", "https://store.example.test"),
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", SECRET),
            ("ADMIN_BOOTSTRAP_EMAIL", "root@clinic.test"),
            ("ADMIN_BOOTSTRAP_PASSWORD", "Bootstrap123"),
            ("ADMIN_BOOTSTRAP_FAMILY_NAME", "Operator"),
        ]))
        .unwrap();
        assert_eq!(
            config.admin_bootstrap,
            Some(AdminBootstrap {
                email: "root@clinic.test".to_string(),
                password: "Bootstrap123".to_string(),
                display_name: "Admin".to_string(),
                family_name: "Operator".to_string(),
            })
        );

        let err = Config::from_lookup(lookup_from(&[
            ("STORE_URL", "https://store.example.test"),
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", SECRET),
            ("ADMIN_BOOTSTRAP_EMAIL", "root@clinic.test"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("set together"));
    }

    #[test]
    fn test_sqlite_backend() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "sqlite"),
            ("DATABASE_URL", "sqlite://clinic.db"),
            ("DB_MAX_CONNECTIONS", "8"),
            ("JWT_SECRET", SECRET),
            ("APP_ENV", "development"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:4200, https://clinic.example.test,"),
        ]))
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                database_url: "sqlite://clinic.db".to_string(),
                max_connections: 8,
                acquire_timeout_seconds: 3,
            }
        );
        assert!(config.diagnostics_enabled());
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:4200", "https://clinic.example.test"]
        );
    }

    #[test]
    fn test_missing_secret_fails() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_URL", "https://store.example.test"),
            ("STORE_API_KEY", "service-key"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_fails() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_URL", "https://store.example.test"),
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn test_missing_store_url_fails() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STORE_URL"));
    }

    #[test]
    fn test_invalid_values_fail() {
        let base = [
            ("STORE_URL", "https://store.example.test"),
            ("STORE_API_KEY", "service-key"),
            ("JWT_SECRET", SECRET),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("SERVER_PORT", "not-a-port"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("JWT_EXPIRES_IN_SECONDS", "0"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("BCRYPT_COST", "2"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("STORE_BACKEND", "mongo"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
