//! Persistence capability handed to each loader stage.
//!
//! Loaders never reach for a global connection; they receive an
//! [`EntityStore`] per entity type, so the same pipeline runs against
//! [`Neo4jStore`] in production and [`MemoryStore`] in dry runs and tests.

pub mod memory;
pub mod neo4j;

pub use memory::MemoryStore;
pub use neo4j::{Neo4jConfig, Neo4jStore};

use crate::models::Entity;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Persists every record in one call. Records whose id already exists
    /// replace the stored version.
    async fn save_all(&self, records: Vec<T>) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;
}
