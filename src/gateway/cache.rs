use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{Gateway, GatewayError};
use crate::models::{Fields, SyncRecord};

/// Caches `list` results per venue until [`CachedGateway::invalidate`] is
/// called. Writes pass straight through and leave the cache untouched, so a
/// caller that writes must invalidate before it can read its own changes.
pub struct CachedGateway<R: SyncRecord> {
    inner: Arc<dyn Gateway<R>>,
    lists: Mutex<HashMap<String, Vec<R>>>,
}

impl<R: SyncRecord> CachedGateway<R> {
    pub fn new(inner: Arc<dyn Gateway<R>>) -> Self {
        Self {
            inner,
            lists: Mutex::new(HashMap::new()),
        }
    }

    /// Drops the cached list of one venue.
    pub fn invalidate(&self, bar_id: &str) {
        let removed = self
            .lists
            .lock()
            .map(|mut lists| lists.remove(bar_id).is_some())
            .unwrap_or(false);
        if removed {
            tracing::debug!(table = R::TABLE, bar_id, "invalidated cached list");
        }
    }

    pub fn is_cached(&self, bar_id: &str) -> bool {
        self.lists
            .lock()
            .map(|lists| lists.contains_key(bar_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl<R: SyncRecord> Gateway<R> for CachedGateway<R> {
    async fn list(&self, bar_id: &str) -> Result<Vec<R>, GatewayError> {
        let cached = self
            .lists
            .lock()
            .ok()
            .and_then(|lists| lists.get(bar_id).cloned());
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let fresh = self.inner.list(bar_id).await?;
        if let Ok(mut lists) = self.lists.lock() {
            lists.insert(bar_id.to_string(), fresh.clone());
        }
        Ok(fresh)
    }

    async fn create(&self, fields: Fields) -> Result<R, GatewayError> {
        self.inner.create(fields).await
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<R, GatewayError> {
        self.inner.update(id, fields).await
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.inner.delete(id).await
    }
}
