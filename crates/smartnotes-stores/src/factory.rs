//! Factory for creating card stores.

use std::sync::Arc;

use smartnotes_core::config::{StoreConfig, StoreProvider};
use smartnotes_core::error::{NotesError, NotesResult};
use smartnotes_core::store::InMemoryCardStore;
use smartnotes_core::traits::CardStore;
use tracing::info;

/// Factory for creating card stores.
pub struct CardStoreFactory;

impl CardStoreFactory {
    /// Create a card store from the given configuration.
    ///
    /// Remote backends connect eagerly so misconfiguration surfaces at startup.
    pub async fn create(config: &StoreConfig) -> NotesResult<Arc<dyn CardStore>> {
        match config.provider {
            StoreProvider::Memory => {
                info!("Using in-memory card store");
                Ok(Arc::new(InMemoryCardStore::new()))
            }

            #[cfg(feature = "mongodb")]
            StoreProvider::MongoDB => {
                let store = crate::mongodb::MongoCardStore::new(config).await?;
                info!(
                    database = %config.database,
                    collection = %config.collection,
                    "Connected to MongoDB card store"
                );
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            other => Err(NotesError::Configuration(format!(
                "Card store provider {:?} is not enabled. Enable the corresponding feature flag.",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = CardStoreFactory::create(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.health_check().await.is_ok());
    }
}
