// Fact store backends

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryFactStore;
pub use sqlite::SqliteFactStore;
pub use traits::FactStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use std::sync::Arc;

/// Open the single store handle shared by every stage of a run
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn FactStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryFactStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteFactStore::open(&config.path)?)),
    }
}
