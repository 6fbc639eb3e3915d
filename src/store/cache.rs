use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Key for a cached search response.
///
/// Coordinates are rounded to 4 decimal places (~11 m) so that requests from
/// effectively the same spot share an entry, and the query is lowercased.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Search {
        query: String,
        latitude: f64,
        longitude: f64,
        radius: f64,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search {
                query,
                latitude,
                longitude,
                radius,
            } => write!(
                f,
                "search:{}:{:.4}:{:.4}:{}",
                query.to_lowercase(),
                latitude,
                longitude,
                radius
            ),
        }
    }
}

/// Process-wide in-memory cache for search responses.
///
/// Values are stored as JSON strings keyed by the normalized request
/// parameters. Entries live for the lifetime of the process; there is no
/// expiry. Created once at startup and cloned into the router state.
/// Concurrent writes to the same key are not serialized; last write wins.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl Cache {
    /// Creates a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a value from the cache by key
    ///
    /// This function attempts to retrieve a cached value associated with the given key.
    /// If the key exists in the cache, the value is deserialized and returned.
    /// If the key does not exist, `None` is returned.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let entries = self.entries.read().await;

        match entries.get(&format!("{}", key)) {
            Some(json) => {
                let data = serde_json::from_str(json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache
    ///
    /// The value is serialized to JSON before being stored. Serialization
    /// failures are logged and the entry is skipped; a cache write is never
    /// allowed to fail a request.
    pub async fn set_in_cache<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let mut entries = self.entries.write().await;
        entries.insert(format!("{}", key), json);
    }

    /// Number of entries currently stored
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
