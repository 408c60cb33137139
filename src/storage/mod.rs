//! Storage implementations for different backends

#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod seed;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use crate::catalog::model::{Garment, School, Size};
use crate::config::{StorageBackend, StorageConfig};
use crate::core::error::{ConfigError, Result};
use crate::core::service::{CatalogStore, DataService, OrderStore, ShopBackend};
use std::sync::Arc;

/// Handles to every table, shared by the services and the HTTP layer
#[derive(Clone)]
pub struct Stores {
    pub schools: Arc<dyn DataService<School>>,
    pub garments: Arc<dyn DataService<Garment>>,
    pub sizes: Arc<dyn DataService<Size>>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Share one backend across all tables
    pub fn from_backend<B: ShopBackend>(backend: B) -> Self {
        let backend = Arc::new(backend);
        Self {
            schools: backend.clone(),
            garments: backend.clone(),
            sizes: backend.clone(),
            catalog: backend.clone(),
            orders: backend,
        }
    }

    /// Fresh, empty in-memory storage
    #[cfg(feature = "in-memory")]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryStore::new())
    }

    /// Open the backend named in the storage settings
    ///
    /// Postgres connections create any missing tables before returning.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            #[cfg(feature = "in-memory")]
            StorageBackend::InMemory => Ok(Self::in_memory()),

            #[cfg(feature = "postgres")]
            StorageBackend::Postgres => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    ConfigError::MissingField {
                        field: "database_url".to_string(),
                        context: "storage (postgres backend)".to_string(),
                    }
                })?;
                let store = PostgresStore::connect(url, config.max_connections).await?;
                store.ensure_schema().await?;
                Ok(Self::from_backend(store))
            }

            #[allow(unreachable_patterns)]
            backend => Err(ConfigError::InvalidValue {
                field: "storage.backend".to_string(),
                value: format!("{backend:?}"),
                message: "backend not compiled in; enable its cargo feature".to_string(),
            }
            .into()),
        }
    }
}
