//! Thin Redis wrapper for non-HTTP caching (resolution lookups, quota
//! status snapshots). `HttpClient` keeps its own connection for provider
//! response caching; this one backs everything else that wants a TTL'd
//! key/value store.

use std::time::Duration;

use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("conn", &"ConnectionManager").finish()
    }
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(CoreError::Cache)?;
        let conn = ConnectionManager::new(client).await.map_err(CoreError::Cache)?;
        Ok(Self { conn })
    }

    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let data: Option<String> = self.conn.get(key).await.map_err(CoreError::Cache)?;
        match data {
            Some(json) => {
                debug!(key, "cache hit");
                Ok(Some(serde_json::from_str(&json).map_err(CoreError::Serialization)?))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&mut self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let json = serde_json::to_string(value).map_err(CoreError::Serialization)?;
        match ttl {
            Some(ttl) if ttl.as_secs() > 0 => {
                self.conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await.map_err(CoreError::Cache)?;
            }
            _ => {
                self.conn.set::<_, _, ()>(key, json).await.map_err(CoreError::Cache)?;
            }
        }
        Ok(())
    }

    pub async fn del(&mut self, key: &str) -> Result<()> {
        self.conn.del::<_, ()>(key).await.map_err(CoreError::Cache)?;
        Ok(())
    }
}
