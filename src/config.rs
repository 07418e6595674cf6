// Application configuration loaded from environment variables

use argon2::Params;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::auth::token::JwtSecret;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SSL_MODE: &str = "disable";
const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:5500",
    "http://127.0.0.1:5500",
    "http://localhost:8000",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,

    #[error("DATABASE_URL or all of DB_HOST, DB_USER, DB_PASSWORD, DB_NAME and DB_PORT must be set (missing {0})")]
    MissingDatabaseSettings(&'static str),

    #[error("invalid DATABASE_URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid password hashing parameters: {0}")]
    InvalidHashParams(String),
}

/// Runtime configuration for the API server
#[derive(Clone)]
pub struct Config {
    pub jwt_secret: JwtSecret,
    pub database: PgConnectOptions,
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub password_params: Params,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .map(JwtSecret::new)
            .ok_or(ConfigError::MissingJwtSecret)?;

        let database = match get("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url)
                .map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()))?,
            None => database_from_parts(&get)?,
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT").map(|v| ("PORT", v)).or_else(|| get("API_PORT").map(|v| ("API_PORT", v))) {
            Some((key, value)) => parse_value(key, &value)?,
            None => DEFAULT_PORT,
        };

        let cors_allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let password_params = password_params(&get)?;

        Ok(Self {
            jwt_secret,
            database,
            host,
            port,
            cors_allowed_origins,
            password_params,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &self.jwt_secret)
            .field("database_host", &self.database.get_host())
            .field("database_port", &self.database.get_port())
            .field("database_name", &self.database.get_database())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("password_params", &self.password_params)
            .finish()
    }
}

/// Connection options from the discrete `DB_*` settings, values passed through verbatim
fn database_from_parts<G>(get: &G) -> Result<PgConnectOptions, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let require = |key: &'static str| get(key).ok_or(ConfigError::MissingDatabaseSettings(key));

    let host = require("DB_HOST")?;
    let user = require("DB_USER")?;
    let password = require("DB_PASSWORD")?;
    let name = require("DB_NAME")?;
    let port: u16 = parse_value("DB_PORT", &require("DB_PORT")?)?;
    let ssl_mode = get("DB_SSLMODE").unwrap_or_else(|| DEFAULT_SSL_MODE.to_string());
    let ssl_mode = PgSslMode::from_str(&ssl_mode).map_err(|_| ConfigError::InvalidValue {
        key: "DB_SSLMODE",
        value: ssl_mode.clone(),
    })?;

    Ok(PgConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&user)
        .password(&password)
        .database(&name)
        .ssl_mode(ssl_mode))
}

fn password_params<G>(get: &G) -> Result<Params, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let read = |key: &'static str, default: u32| -> Result<u32, ConfigError> {
        match get(key) {
            Some(value) => parse_value(key, &value),
            None => Ok(default),
        }
    };

    let memory_kib = read("PASSWORD_HASH_MEMORY_KIB", Params::DEFAULT_M_COST)?;
    let iterations = read("PASSWORD_HASH_ITERATIONS", Params::DEFAULT_T_COST)?;
    let parallelism = read("PASSWORD_HASH_PARALLELISM", Params::DEFAULT_P_COST)?;

    Params::new(memory_kib, iterations, parallelism, None)
        .map_err(|e| ConfigError::InvalidHashParams(e.to_string()))
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
