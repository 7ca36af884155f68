//! In-memory token store.

use crate::error::StoreError;
use crate::store::TokenStore;
use crate::types::RegistrationRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Token store kept in process memory.
///
/// Used when persistence is disabled and in tests. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    record: Arc<RwLock<RegistrationRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing record.
    pub fn with_record(record: RegistrationRecord) -> Self {
        Self {
            record: Arc::new(RwLock::new(record)),
        }
    }

    /// Snapshot of the current record.
    pub async fn record(&self) -> RegistrationRecord {
        self.record.read().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn read_sender_ids(&self) -> Result<Option<String>, StoreError> {
        Ok(self.record.read().await.sender_ids.clone())
    }

    async fn read_app_version(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.record.read().await.version_code)
    }

    async fn read_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.record.read().await.registration_id.clone())
    }

    async fn write_all(
        &self,
        sender_ids: &str,
        app_version: i32,
        token: &str,
    ) -> Result<(), StoreError> {
        let mut record = self.record.write().await;
        *record = RegistrationRecord::new(sender_ids, app_version, token);
        debug!("Memory store: replaced registration record");
        Ok(())
    }
}
