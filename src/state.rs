//! Shared application state passed into every handler. Explicit handles
//! instead of process-wide singletons, so tests can swap in an in-memory
//! database and cache.

use sea_orm::DatabaseConnection;

use crate::cache::Cache;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: Cache,
    /// Configured pool ceiling, reported by `/metrics`.
    pub max_connections: u32,
}

impl AppState {
    #[must_use]
    pub fn new(db: DatabaseConnection, cache: Cache, max_connections: u32) -> Self {
        Self {
            db,
            cache,
            max_connections,
        }
    }
}
