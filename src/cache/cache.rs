use std::{
    fmt::{self, Debug, Display},
    future::Future,
};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, CacheError};

// Caching - keys

/// Every scope owns a generation value. Entries are stored with the generation
/// current at write time and are stale once the generation moves.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheScope {
    Tags,
    Ingredients,
    Custom(String),
}

impl CacheScope {
    pub fn key<T: ToString>(self, key: T) -> CacheKey {
        CacheKey {
            value: key.to_string(),
            scope: self,
        }
    }

    fn bind_key(&self) -> String {
        match self {
            CacheScope::Tags => String::from("tag-cache-key"),
            CacheScope::Ingredients => String::from("ingredient-cache-key"),
            CacheScope::Custom(name) => format!("{name}-cache-key"),
        }
    }

    pub async fn current_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, CacheError> {
        get_cache_value::<String, String>(self.bind_key(), cache).await
    }

    /// Moves the generation, which drops every entry of the scope at once.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), CacheError> {
        log::trace!("> Invalidating {}", self.bind_key());
        set_cache_value(self.bind_key(), Uuid::new_v4().to_string(), cache).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
    value: String,
    scope: CacheScope,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            CacheScope::Tags => write!(f, "tag-{}", self.value),
            CacheScope::Ingredients => write!(f, "ingredient-{}", self.value),
            CacheScope::Custom(name) => write!(f, "{name}-{}", self.value),
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct CachedValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> CachedValue<T> {
    /// Returns the cached value when its generation is current, otherwise runs
    /// `callback` and stores the result. Cache failures fall back to `callback`.
    pub async fn get_or<F, Fut>(
        key: CacheKey,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let bind = match key.scope.current_bind(cache).await {
            Ok(bind) => bind,
            Err(e) => {
                log::error!("> Cache unavailable, fetching {key} directly: {e}");
                return callback().await;
            }
        };

        let stored = get_cache_value::<String, CachedValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        match stored {
            Some(stored) if stored.bind == bind => {
                log::trace!("> Found {key}");
                return Ok(stored.value);
            }
            Some(_) => log::trace!("> Invalidated {key}"),
            None => {}
        }

        log::trace!("> Fetching {key}");
        let stored = CachedValue {
            value: callback().await?,
            bind,
        };

        if let Err(e) = set_cache_value(key.to_string(), &stored, cache).await {
            log::error!("{e}");
        }

        Ok(stored.value)
    }
}

/// Used after catalogue writes. Without a connection there is nothing to invalidate.
pub async fn invalidate_scope(scope: CacheScope, cache: Option<&mut MultiplexedConnection>) {
    if let Some(cache) = cache {
        if let Err(e) = scope.invalidate(cache).await {
            log::error!("> Failed to invalidate {scope:?}: {e}");
        }
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CacheError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_by_scope() {
        assert_eq!(CacheScope::Tags.key("all").to_string(), "tag-all");
        assert_eq!(
            CacheScope::Ingredients.key("search:мук").to_string(),
            "ingredient-search:мук"
        );
        assert_eq!(
            CacheScope::Custom("authors".to_string()).key(7).to_string(),
            "authors-7"
        );
    }

    #[test]
    fn scopes_have_distinct_generation_keys() {
        assert_eq!(CacheScope::Tags.bind_key(), "tag-cache-key");
        assert_eq!(CacheScope::Ingredients.bind_key(), "ingredient-cache-key");
        assert_ne!(CacheScope::Tags.bind_key(), CacheScope::Ingredients.bind_key());
    }

    #[test]
    fn cached_value_round_trips_through_json() {
        let stored = CachedValue {
            value: vec!["breakfast".to_string()],
            bind: Some("generation".to_string()),
        };

        let json = serde_json::to_string(&stored).unwrap();
        let restored: CachedValue<Vec<String>> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.value, stored.value);
        assert_eq!(restored.bind, stored.bind);
    }
}
