use std::{env, fmt::Display, str::FromStr};

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    constants::{DEFAULT_MAX_CONNECTIONS, DEFAULT_SHOPPING_LIST_TITLE},
    error::{ApiError, CacheError, ConfigError, QueryError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub redis_url: Option<String>,
    pub shopping_list_title: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::missing("DATABASE_URL"))?;

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        if redis_url.is_none() {
            log::info!("REDIS_URL not set, caching disabled");
        }

        Ok(Self {
            database_url,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            redis_url,
            shopping_list_title: try_load(
                &lookup,
                "SHOPPING_LIST_TITLE",
                DEFAULT_SHOPPING_LIST_TITLE.to_string(),
            ),
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value: {e}, using default: {default}");
            default
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            default
        }
    }
}

/// Opens the pool and applies pending migrations.
pub async fn connect(config: &Config) -> Result<Pool<Postgres>, ApiError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("Connected to database");
    Ok(pool)
}

/// `None` when caching is disabled.
pub async fn connect_cache(config: &Config) -> Result<Option<MultiplexedConnection>, CacheError> {
    let url = match &config.redis_url {
        Some(url) => url,
        None => return Ok(None),
    };

    let client = redis::Client::open(url.as_str())?;
    let connection = client.get_multiplexed_async_connection().await?;

    log::info!("Connected to cache");
    Ok(Some(connection))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/foodgram")]).unwrap();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.shopping_list_title, DEFAULT_SHOPPING_LIST_TITLE);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = config(&[("REDIS_URL", "redis://localhost")]).unwrap_err();

        assert_eq!(err.to_string(), "Environment variable DATABASE_URL must be set");
    }

    #[test]
    fn invalid_pool_size_falls_back_to_default() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ])
        .unwrap();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn explicit_values_are_used() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("SHOPPING_LIST_TITLE", "Kitchen"),
        ])
        .unwrap();

        assert_eq!(config.max_connections, 12);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.shopping_list_title, "Kitchen");
    }
}
