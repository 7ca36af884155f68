//! File-backed token store.

use crate::error::StoreError;
use crate::store::{TokenStore, NAMESPACE};
use crate::types::RegistrationRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Token store persisted as a JSON document on disk.
///
/// The document lives at `<dir>/gcm-proxy-registration.json`. Writes go to
/// a sibling temp file which is then renamed over the document.
///
/// The store owns its document: it is parsed once, and afterwards reads are
/// served from the last loaded or written record.
pub struct FileStore {
    storage_path: PathBuf,
    /// Serializes writers so two renames never interleave.
    write_lock: Mutex<()>,
    snapshot: RwLock<Option<RegistrationRecord>>,
}

impl FileStore {
    /// Create a store rooted in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            storage_path: dir.as_ref().join(format!("{}.json", NAMESPACE)),
            write_lock: Mutex::new(()),
            snapshot: RwLock::new(None),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Check if a registration document exists.
    pub fn exists(&self) -> bool {
        self.storage_path.exists()
    }

    /// Load the stored record.
    ///
    /// Returns an empty record if the document doesn't exist.
    pub async fn load(&self) -> Result<RegistrationRecord, StoreError> {
        let data = match fs::read(&self.storage_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Registration document not found at {:?}, nothing stored",
                    self.storage_path
                );
                return Ok(RegistrationRecord::default());
            }
            Err(e) => return Err(e.into()),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            warn!("Registration document is empty, treating as nothing stored");
            return Ok(RegistrationRecord::default());
        }

        Ok(serde_json::from_slice(&data)?)
    }

    /// Current record, loading the document on first use.
    pub async fn snapshot(&self) -> Result<RegistrationRecord, StoreError> {
        if let Some(record) = self.snapshot.read().await.as_ref() {
            return Ok(record.clone());
        }

        let mut snapshot = self.snapshot.write().await;
        if let Some(record) = snapshot.as_ref() {
            return Ok(record.clone());
        }
        let record = self.load().await?;
        *snapshot = Some(record.clone());
        Ok(record)
    }

    /// Persist a full record.
    pub async fn save(&self, record: &RegistrationRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let data = serde_json::to_vec_pretty(record)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.storage_path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.storage_path).await?;
        *self.snapshot.write().await = Some(record.clone());

        info!(
            "Saved registration record ({} bytes) to {:?}",
            data.len(),
            self.storage_path
        );
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn read_sender_ids(&self) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot().await?.sender_ids)
    }

    async fn read_app_version(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.snapshot().await?.version_code)
    }

    async fn read_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot().await?.registration_id)
    }

    async fn write_all(
        &self,
        sender_ids: &str,
        app_version: i32,
        token: &str,
    ) -> Result<(), StoreError> {
        self.save(&RegistrationRecord::new(sender_ids, app_version, token))
            .await
    }
}
