//! Runtime configuration for the campaign server.

use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug)]
pub struct Settings {
    /// Postgres connection URL (either `DATABASE_URL` or composed from `DB_*`).
    pub database_url: String,
    pub db_max_connections: u32,
    /// How long a request may wait for a pooled connection.
    pub db_acquire_timeout: Duration,
    pub server_addr: String,
    /// HS256 secret shared with the account service that mints tokens.
    pub jwt_secret: String,
    /// Base URL of the NPC / encounter / treasure generator.
    pub generator_url: String,
    pub generator_timeout: Duration,
    /// Deadline for one request's worth of service work.
    pub request_timeout: Duration,
}

/// Individual connection parameters, as exposed by most hosting providers.
#[derive(Debug, Clone)]
pub struct DbParts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Builds a `postgres://` URL, percent-encoding the credentials.
pub fn compose_database_url(parts: &DbParts) -> String {
    let fallback = format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        parts.user, parts.password, parts.host, parts.port, parts.name, parts.sslmode
    );

    let Ok(mut url) = Url::parse(&format!(
        "postgres://{}:{}/{}",
        parts.host, parts.port, parts.name
    )) else {
        return fallback;
    };
    if url.set_username(&parts.user).is_err() || url.set_password(Some(&parts.password)).is_err() {
        return fallback;
    }
    url.query_pairs_mut().append_pair("sslmode", &parts.sslmode);
    url.to_string()
}

/// A bare service name (no scheme) is a Render private host.
pub fn normalize_generator_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}.onrender.com")
    }
}

impl Settings {
    fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            compose_database_url(&DbParts {
                host: env_or("DB_HOST", "localhost"),
                port: env_parse("DB_PORT", 5432),
                user: env_or("DB_USER", "user"),
                password: env_or("DB_PASSWORD", "password"),
                name: env_or("DB_NAME", "rpg_saas"),
                sslmode: env_or("DB_SSLMODE", "disable"),
            })
        });

        Settings {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            db_acquire_timeout: Duration::from_secs(env_parse("DB_ACQUIRE_TIMEOUT", 5)),
            server_addr: env_or("SERVER_ADDR", "127.0.0.1:8080"),
            jwt_secret: env_or("JWT_SECRET", "dev-secret-change-me"),
            generator_url: normalize_generator_url(&env_or(
                "AI_SERVICE_URL",
                "http://127.0.0.1:5000",
            )),
            generator_timeout: Duration::from_secs(env_parse("AI_SERVICE_TIMEOUT", 10)),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT", 30)),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
