pub mod redis_cache;

pub use redis_cache::RedisIntentCache;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::RegistrationIntent;
use crate::error::{AppError, Result};

/// Key-value store with expiry holding pending-checkout intents.
/// Owned exclusively by the checkout/webhook pair for the lifetime of
/// one order id.
#[async_trait]
pub trait IntentCache: Send + Sync {
    async fn put(&self, order_id: &str, intent: &RegistrationIntent, ttl: Duration) -> Result<()>;
    async fn get(&self, order_id: &str) -> Result<Option<RegistrationIntent>>;
    async fn delete(&self, order_id: &str) -> Result<()>;
}

/// Cache key for a pending checkout.
pub(crate) fn intent_key(order_id: &str) -> String {
    format!("pay:{}", order_id)
}

/// In-process fallback used when no Redis URL is configured, and by the
/// test suite. Entries expire lazily on read.
#[derive(Default)]
pub struct MemoryIntentCache {
    entries: Mutex<HashMap<String, (DateTime<Utc>, String)>>,
}

impl MemoryIntentCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntentCache for MemoryIntentCache {
    async fn put(&self, order_id: &str, intent: &RegistrationIntent, ttl: Duration) -> Result<()> {
        let value = serde_json::to_string(intent)
            .map_err(|e| AppError::Cache(format!("Failed to encode intent: {}", e)))?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| AppError::Cache(format!("Invalid TTL: {}", e)))?;

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Cache("Cache lock poisoned".to_string()))?;
        entries.insert(intent_key(order_id), (expires_at, value));
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<RegistrationIntent>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Cache("Cache lock poisoned".to_string()))?;

        let key = intent_key(order_id);
        match entries.get(&key) {
            Some((expires_at, value)) => {
                if *expires_at <= Utc::now() {
                    entries.remove(&key);
                    return Ok(None);
                }
                let intent = serde_json::from_str(value)
                    .map_err(|e| AppError::Cache(format!("Failed to decode intent: {}", e)))?;
                Ok(Some(intent))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, order_id: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Cache("Cache lock poisoned".to_string()))?;
        entries.remove(&intent_key(order_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, ProgramIntent, RegistrationSource};
    use uuid::Uuid;

    fn sample_intent() -> RegistrationIntent {
        RegistrationIntent::Program(ProgramIntent {
            program_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            phone: None,
            institution: None,
            segment: None,
            user_id: None,
            member_id: None,
            source: RegistrationSource::NonMember,
            amount: 60000,
            currency: "IDR".to_string(),
            method: PaymentMethod::Qris,
        })
    }

    #[tokio::test]
    async fn memory_cache_round_trip_and_delete() {
        let cache = MemoryIntentCache::new();
        let intent = sample_intent();

        cache
            .put("PRG-1", &intent, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("PRG-1").await.unwrap(), Some(intent));

        cache.delete("PRG-1").await.unwrap();
        assert_eq!(cache.get("PRG-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_cache_expires_entries() {
        let cache = MemoryIntentCache::new();
        cache
            .put("PRG-2", &sample_intent(), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(cache.get("PRG-2").await.unwrap(), None);
    }
}
