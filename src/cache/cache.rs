use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{error::CacheError, INGREDIENT_CACHE_BIND, TAG_CACHE_BIND};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for String {
    fn from(value: &CacheKey<T>) -> Self {
        match &value._type {
            CacheKeyType::Tags => format!("tags-{}", value._value.to_string()),
            CacheKeyType::Ingredients => format!("ingredients-{}", value._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<CacheKey<T>> for CacheLifetime {
    fn from(value: CacheKey<T>) -> Self {
        match value._type {
            CacheKeyType::Tags => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredients => CacheLifetime::BindIngredientCache,
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindTagCache => TAG_CACHE_BIND,
            CacheLifetime::BindIngredientCache => INGREDIENT_CACHE_BIND,
        }
    }

    /// The current binding token. `None` until the first [`invalidate`](Self::invalidate).
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, potion::Error> {
        get_cache_value::<&str, String>(self.bind_key(), cache).await
    }

    /// Replaces the binding token so every value bound to it is treated as stale.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), potion::Error> {
        let key = self.bind_key();
        let token = uuid::Uuid::new_v4().to_string();
        log::debug!("> Rebinding {key} to {token}");
        set_cache_value(key, token, cache).await
    }
}

/// A cached value together with the binding token that was current when it was stored.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
{
    fn bound(value: T, lifetime: CacheLifetime, bind: Option<String>) -> Self {
        Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        }
    }

    fn is_bound_to(&self, bind: &Option<String>) -> bool {
        &self._bind == bind
    }

    /// The entry under `key` if it is present, decodable and bound to `bind`.
    /// Undecodable entries are dropped in the background.
    async fn cached<K>(
        key: &CacheKey<K>,
        bind: &Option<String>,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<Self>, potion::Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
    {
        let name = key.to_string();
        let entry = match get_cache_value::<&str, Self>(&name, cache).await {
            Ok(entry) => entry,
            Err(_) => {
                let mut connection = cache.clone();
                tokio::spawn(async move {
                    log::error!("> Dropping undecodable cache entry {name}");
                    if let Err(e) = delete_cache_value(&name, &mut connection).await {
                        log::error!("> Failed to drop {name}: {}", e.info.unwrap_or_default());
                    }
                });
                return Ok(None);
            }
        };

        let Some(entry) = entry else {
            log::trace!("> Miss {name}");
            return Ok(None);
        };
        if !entry.is_bound_to(bind) {
            log::trace!("> Stale {name}");
            return Ok(None);
        }

        log::trace!("> Hit {name}");
        Ok(Some(entry))
    }

    /// Returns the cached value under `key` while its binding is current, otherwise runs
    /// `callback` and stores the result.
    ///
    /// The token is read before `callback` runs. A value fetched across an invalidation is
    /// stored under the old token and is stale on the next read.
    pub async fn get_or<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, potion::Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, potion::Error>> + Send + 'a,
    {
        let lifetime: CacheLifetime = key.to_owned().into();
        let bind = lifetime.get_cache_bind(cache).await?;

        if let Some(entry) = Self::cached(&key, &bind, cache).await? {
            return Ok(entry);
        }

        let entry = Self::bound(callback().await?, lifetime, bind);
        set_cache_value(key.to_string(), entry.clone(), cache).await?;

        Ok(entry)
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
