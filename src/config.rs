use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::users::password::PasswordError;

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub max_connections: u32,
    pub max_idle_secs: u64,
    pub query_timeout_secs: u64,
}

impl DbConfig {
    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    /// Deadline applied to every individual store call.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub activation_ttl_hours: i64,
    pub authentication_ttl_hours: i64,
}

impl TokenConfig {
    pub fn activation_ttl(&self) -> time::Duration {
        time::Duration::hours(self.activation_ttl_hours)
    }

    pub fn authentication_ttl(&self) -> time::Duration {
        time::Duration::hours(self.authentication_ttl_hours)
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordConfig {
    pub fn params(&self) -> Result<argon2::Params, PasswordError> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db: DbConfig,
    pub tokens: TokenConfig,
    pub password: PasswordConfig,
    pub smtp: SmtpConfig,
    pub cors_trusted_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let db = DbConfig {
            max_connections: env_or("DB_MAX_CONNECTIONS", 25),
            max_idle_secs: env_or("DB_MAX_IDLE_SECS", 15 * 60),
            query_timeout_secs: env_or("DB_QUERY_TIMEOUT_SECS", 3),
        };
        let tokens = TokenConfig {
            activation_ttl_hours: env_or("ACTIVATION_TOKEN_TTL_HOURS", 72),
            authentication_ttl_hours: env_or("AUTH_TOKEN_TTL_HOURS", 24),
        };
        let password = PasswordConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", 19 * 1024),
            iterations: env_or("ARGON2_ITERATIONS", 2),
            parallelism: env_or("ARGON2_PARALLELISM", 1),
        };
        password.params()?;
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: env_or("SMTP_PORT", 25),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            sender: std::env::var("SMTP_SENDER")
                .unwrap_or_else(|_| "MyReference <no-reply@myreference.local>".into()),
        };
        let cors_trusted_origins = std::env::var("CORS_TRUSTED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        Ok(Self {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 4000),
            database_url,
            db,
            tokens,
            password,
            smtp,
            cors_trusted_origins,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
