//! Runtime settings loaded from the environment.

use std::{
    collections::HashMap, env, fmt::Display, net::SocketAddr, ops::RangeInclusive, path::PathBuf,
    str::FromStr,
};

use jsonwebtoken::Algorithm;
use thiserror::Error;
use tracing::info;

/// Errors raised while reading [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Upper bound for `ACCESS_TOKEN_EXPIRE_MINUTES`: one year.
pub const MAX_TOKEN_MINUTES: i64 = 60 * 24 * 365;

/// Upper bound for `ADMIN_SESSION_HOURS`: one year.
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

/// Typed view over the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
    pub session_secure: bool,
    pub admin_session_hours: i64,
}

impl Settings {
    /// Reads settings from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an explicit map, mostly for tests.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let algorithm = parse_or(&lookup, "ALGORITHM", Algorithm::HS256)?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                key: "ALGORITHM",
                message: format!("{algorithm:?} is not an HMAC algorithm"),
            });
        }

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                message: format!("{bcrypt_cost} is outside 4..=31"),
            });
        }

        let access_token_expire_minutes = parse_bounded(
            &lookup,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            30,
            1..=MAX_TOKEN_MINUTES,
        )?;
        let admin_session_hours =
            parse_bounded(&lookup, "ADMIN_SESSION_HOURS", 24, 1..=MAX_SESSION_HOURS)?;

        let secret_key = require("SECRET_KEY")?;
        if secret_key.is_empty() {
            return Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                message: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            secret_key,
            algorithm,
            access_token_expire_minutes,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            upload_dir: parse_or(&lookup, "UPLOAD_DIR", PathBuf::from("uploads"))?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            bcrypt_cost,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            session_secure: parse_or(&lookup, "SESSION_SECURE", false)?,
            admin_session_hours,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}

/// Like [`parse_or`], but the value must also fall inside `bounds`.
fn parse_bounded<F>(
    lookup: &F,
    key: &'static str,
    default: i64,
    bounds: RangeInclusive<i64>,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if !bounds.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            message: format!(
                "{value} is outside {}..={}",
                bounds.start(),
                bounds.end()
            ),
        });
    }
    Ok(value)
}
