//! Configuration loading and representation.
//!
//! Values come from environment variables (after `.env` is loaded by the
//! binary). Parsing goes through a lookup closure so tests never touch the
//! process environment.

use thiserror::Error;
use tracing::warn;

pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@egyptholiday.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

pub use ehm_observability::LogFormat;

/// Initial admin account created at startup when no admin exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// `Some(url)` selects the Postgres stores.
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub admin: AdminSeed,
    pub log_format: LogFormat,
}

fn parse_num<T: core::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: core::fmt::Display,
{
    match raw.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_flag(raw: Option<String>) -> bool {
    raw.map(|r| matches!(r.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl PortalConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_num("PORT", lookup("PORT"), 5000u16)?;
        let jwt_ttl_hours = parse_num("JWT_TTL_HOURS", lookup("JWT_TTL_HOURS"), 24i64)?;
        if jwt_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_HOURS",
                value: jwt_ttl_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let database_url = if parse_flag(lookup("USE_PERSISTENT_STORES")) {
            Some(
                lookup("DATABASE_URL")
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            )
        } else {
            None
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let admin_password = lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()).unwrap_or_else(|| {
            warn!("ADMIN_PASSWORD not set; the initial admin uses the default password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });
        let admin = AdminSeed {
            name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            email: lookup("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            password: admin_password,
        };

        let log_format = match lookup("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                name: "LOG_FORMAT",
                value: raw.clone(),
                reason,
            })?,
        };

        Ok(Self {
            port,
            jwt_secret,
            jwt_ttl_hours,
            database_url,
            cors_origins,
            admin,
            log_format,
        })
    }

    /// Development defaults; used by tests.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 0,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: 24,
            database_url: None,
            cors_origins: DEFAULT_CORS_ORIGINS.split(',').map(str::to_string).collect(),
            admin: AdminSeed {
                name: "Administrator".to_string(),
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
            },
            log_format: LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<PortalConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.jwt_ttl_hours, 24);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.cors_origins.len(), 2);
        assert_eq!(cfg.admin.email, DEFAULT_ADMIN_EMAIL);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn persistent_requires_database_url() {
        assert_eq!(
            load(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        let cfg = load(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/ehm"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/ehm"));
    }

    #[test]
    fn database_url_alone_does_not_enable_postgres() {
        let cfg = load(&[("DATABASE_URL", "postgres://localhost/ehm")]).unwrap();
        assert_eq!(cfg.database_url, None);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = load(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        assert!(load(&[("JWT_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn cors_list_is_trimmed() {
        let cfg = load(&[("CORS_ORIGINS", " https://a.example , ,https://b.example")]).unwrap();
        assert_eq!(cfg.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn log_format_choice() {
        assert_eq!(load(&[("LOG_FORMAT", "Pretty")]).unwrap().log_format, LogFormat::Pretty);
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
