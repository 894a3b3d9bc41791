use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INITIAL_CHAT_MESSAGE: &str =
    "Hi! Thanks for your quote request. Let's discuss the details of your installation here.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How bearer tokens are checked at the edge.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Shared HS256 secret (`AUTH_JWT_SECRET`).
    Secret(String),
    /// JWKS of a Supabase project (`SUPABASE_URL` + `SUPABASE_ANON_KEY`).
    Supabase { project_url: String, anon_key: String },
}

/// Engine knobs shared by every request.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// First message the provider side posts into a freshly opened chat.
    pub initial_chat_message: String,
    /// Compare-and-set attempts before a contended write gives up.
    pub write_retry_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_chat_message: DEFAULT_INITIAL_CHAT_MESSAGE.to_string(),
            write_retry_attempts: 5,
        }
    }
}

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    pub run_migrations: bool,
    pub port: u16,
    pub auth: AuthConfig,
    pub role_cache_ttl: Duration,
    pub jwks_cache_ttl: Duration,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;

        let auth = match optional("AUTH_JWT_SECRET") {
            Some(secret) => AuthConfig::Secret(secret),
            None => AuthConfig::Supabase {
                project_url: required("SUPABASE_URL")?,
                anon_key: required("SUPABASE_ANON_KEY")?,
            },
        };

        let engine = EngineConfig {
            initial_chat_message: optional("INITIAL_CHAT_MESSAGE")
                .unwrap_or_else(|| DEFAULT_INITIAL_CHAT_MESSAGE.to_string()),
            write_retry_attempts: parse_or("WRITE_RETRY_ATTEMPTS", 5)?,
        };

        Ok(Self {
            database_url,
            max_db_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or("RUN_MIGRATIONS", false)?,
            port: parse_or("PORT", 8080)?,
            auth,
            role_cache_ttl: Duration::from_secs(parse_or("ROLE_CACHE_TTL_SECS", 300)?),
            jwks_cache_ttl: Duration::from_secs(parse_or("JWKS_CACHE_TTL_SECS", 3600)?),
            engine,
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
