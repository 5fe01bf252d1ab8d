//! Read-through cache shim for single-record lookups.
//!
//! Backends: Redis, an in-process map (useful for development and tests),
//! or nothing at all. When no backend is configured every `get` misses and
//! writes succeed as no-ops, so callers never branch on availability. Any
//! backend error also degrades to a miss; the store remains authoritative.

use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Entry lifetime from write. Invalidation on update/delete is eager; this
/// bounds the staleness window if a process dies between store commit and
/// cache delete.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
enum Backend {
    Disabled,
    Redis(redis::aio::ConnectionManager),
    Memory(Arc<Mutex<HashMap<String, (String, Instant)>>>),
}

/// Cache handle shared through [`crate::state::AppState`].
#[derive(Clone)]
pub struct Cache {
    backend: Backend,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Disabled => "disabled",
            Backend::Redis(_) => "redis",
            Backend::Memory(_) => "memory",
        };
        f.debug_struct("Cache").field("backend", &backend).finish()
    }
}

impl Cache {
    /// A cache that always misses. `set`/`invalidate` succeed as no-ops.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: Backend::Disabled,
        }
    }

    /// In-process cache with the same TTL semantics as the Redis backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// Connect to Redis. The connection manager reconnects on its own, so a
    /// blip after startup degrades to cache misses rather than errors.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let manager = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self {
            backend: Backend::Redis(manager),
        })
    }

    /// Cache key for a single record of a resource.
    #[must_use]
    pub fn key(resource: &str, id: i32) -> String {
        format!("{resource}:{id}")
    }

    /// Look up a cached record. Any backend or decode error is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match &self.backend {
            Backend::Disabled => None,
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                match conn.get::<_, Option<String>>(key).await {
                    Ok(raw) => raw,
                    Err(err) => {
                        tracing::warn!(key, error = %err, "cache read failed");
                        None
                    }
                }
            }
            Backend::Memory(map) => {
                let mut map = map.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                match map.get(key) {
                    Some((raw, expires_at)) if *expires_at > Instant::now() => Some(raw.clone()),
                    Some(_) => {
                        map.remove(key);
                        None
                    }
                    None => None,
                }
            }
        };

        let hit = raw.as_deref().and_then(|raw| serde_json::from_str(raw).ok());
        tracing::debug!(key, hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Store a record with the fixed TTL. Failures are logged and swallowed.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache encode failed");
                return;
            }
        };

        match &self.backend {
            Backend::Disabled => {}
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                if let Err(err) = conn
                    .set_ex::<_, _, ()>(key, raw, CACHE_TTL.as_secs())
                    .await
                {
                    tracing::warn!(key, error = %err, "cache write failed");
                }
            }
            Backend::Memory(map) => {
                let mut map = map.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                map.insert(key.to_string(), (raw, Instant::now() + CACHE_TTL));
            }
        }
    }

    /// Eagerly drop a key. Best effort: a failure leaves the entry to expire
    /// by TTL.
    pub async fn invalidate(&self, key: &str) {
        match &self.backend {
            Backend::Disabled => {}
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                if let Err(err) = conn.del::<_, ()>(key).await {
                    tracing::warn!(key, error = %err, "cache invalidation failed");
                }
            }
            Backend::Memory(map) => {
                map.lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .remove(key);
            }
        }
    }

    /// Raw backend status for the metrics endpoint.
    pub async fn status(&self) -> serde_json::Value {
        match &self.backend {
            Backend::Disabled => serde_json::json!("not configured"),
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                match redis::cmd("INFO").query_async::<String>(&mut conn).await {
                    Ok(info) => serde_json::json!(parse_info(&info)),
                    Err(err) => serde_json::json!(format!("status unavailable: {err}")),
                }
            }
            Backend::Memory(map) => {
                let entries = map
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .len();
                serde_json::json!({ "backend": "memory", "entries": entries })
            }
        }
    }
}

/// Split a Redis INFO report into key/value pairs, skipping section headers.
fn parse_info(info: &str) -> HashMap<String, String> {
    info.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.to_string(), v.trim_end_matches('\r').to_string()))
        })
        .collect()
}
