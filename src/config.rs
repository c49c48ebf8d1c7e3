use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::{env, fmt::Display, str::FromStr};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_write_per_min: u32,

    // Pagination
    pub default_page_limit: u32,
    pub max_page_limit: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let default_page_limit: u32 = parse_or(&lookup, "DEFAULT_PAGE_LIMIT", 10)?;
        let max_page_limit: u32 = parse_or(&lookup, "MAX_PAGE_LIMIT", 100)?;
        if default_page_limit == 0 || default_page_limit > max_page_limit {
            return Err(anyhow!(
                "DEFAULT_PAGE_LIMIT must be between 1 and MAX_PAGE_LIMIT ({max_page_limit})"
            ));
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,

            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_write_per_min: parse_or(&lookup, "RATE_WRITE_PER_MIN", 120)?,

            default_page_limit,
            max_page_limit,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => Ok(default),
    }
}
