use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::cache::{intent_key, IntentCache};
use crate::domain::RegistrationIntent;
use crate::error::{AppError, Result};

/// Redis-backed intent cache. Values are JSON-serialized intents with a
/// server-side TTL, so abandoned checkouts clean themselves up.
#[derive(Clone)]
pub struct RedisIntentCache {
    conn_manager: ConnectionManager,
}

impl RedisIntentCache {
    /// Connect with a pooled connection manager. `redis_url` is e.g.
    /// "redis://127.0.0.1:6379".
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Cache(format!("Failed to create Redis connection manager: {}", e))
        })?;
        Ok(Self { conn_manager })
    }
}

#[async_trait]
impl IntentCache for RedisIntentCache {
    async fn put(&self, order_id: &str, intent: &RegistrationIntent, ttl: Duration) -> Result<()> {
        let value = serde_json::to_string(intent)
            .map_err(|e| AppError::Cache(format!("Failed to encode intent: {}", e)))?;
        let mut conn = self.conn_manager.clone();
        conn.set_ex::<_, _, ()>(intent_key(order_id), value, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<RegistrationIntent>> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn.get(intent_key(order_id)).await?;
        match raw {
            Some(json) => {
                let intent = serde_json::from_str(&json)
                    .map_err(|e| AppError::Cache(format!("Failed to decode intent: {}", e)))?;
                Ok(Some(intent))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, order_id: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        conn.del::<_, ()>(intent_key(order_id)).await?;
        Ok(())
    }
}
