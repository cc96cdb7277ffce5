//! Server settings from `STUDY_*` environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use services::auth::{
    DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_BCRYPT_COST, DEFAULT_REFRESH_TTL_DAYS, MIN_SECRET_LEN,
};
use services::{ServicesConfig, TokenConfig, TutorConfig};

pub const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

#[derive(Debug)]
pub enum ConfigError {
    MissingSecret,
    WeakSecret { min: usize },
    Invalid { var: &'static str, raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSecret => write!(f, "STUDY_JWT_SECRET must be set"),
            ConfigError::WeakSecret { min } => {
                write!(f, "STUDY_JWT_SECRET must be at least {min} bytes")
            }
            ConfigError::Invalid { var, raw } => write!(f, "invalid {var} value: {raw}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_url: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub log_format: LogFormat,
    pub services: ServicesConfig,
}

impl Settings {
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or weak secret and for
    /// unparsable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup("STUDY_JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_LEN,
            });
        }

        let access_minutes: i64 = parse_var(
            &lookup,
            "STUDY_ACCESS_TTL_MINUTES",
            DEFAULT_ACCESS_TTL_MINUTES,
        )?;
        let refresh_days: i64 =
            parse_var(&lookup, "STUDY_REFRESH_TTL_DAYS", DEFAULT_REFRESH_TTL_DAYS)?;
        if access_minutes <= 0 {
            return Err(invalid("STUDY_ACCESS_TTL_MINUTES", access_minutes));
        }
        if refresh_days <= 0 {
            return Err(invalid("STUDY_REFRESH_TTL_DAYS", refresh_days));
        }

        let log_format = match lookup("STUDY_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("" | "text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(invalid("STUDY_LOG_FORMAT", other)),
        };

        Ok(Self {
            db_url: lookup("STUDY_DB_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DB_URL.into()),
            port: parse_var(&lookup, "STUDY_PORT", DEFAULT_PORT)?,
            cors_origin: lookup("STUDY_CORS_ORIGIN").filter(|v| !v.trim().is_empty()),
            log_format,
            services: ServicesConfig {
                tokens: TokenConfig {
                    secret,
                    access_ttl: Duration::minutes(access_minutes),
                    refresh_ttl: Duration::days(refresh_days),
                },
                bcrypt_cost: parse_var(&lookup, "STUDY_BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
                tutor: TutorConfig::from_lookup(&lookup),
            },
        })
    }
}

fn invalid(var: &'static str, raw: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        raw: raw.to_string(),
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| invalid(var, raw))
        }
        _ => Ok(default),
    }
}
