//! Token store contract.

use crate::error::StoreError;
use async_trait::async_trait;

/// Namespace under which registration fields are persisted.
pub const NAMESPACE: &str = "gcm-proxy-registration";

/// Key/value storage for the registration triple.
///
/// `write_all` must be atomic from the caller's point of view: either all
/// three fields change or none do.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stored canonical sender ids, if any.
    async fn read_sender_ids(&self) -> Result<Option<String>, StoreError>;

    /// Stored application version code, if any.
    async fn read_app_version(&self) -> Result<Option<i32>, StoreError>;

    /// Stored registration token, if any.
    async fn read_token(&self) -> Result<Option<String>, StoreError>;

    /// Replace the whole stored triple.
    async fn write_all(
        &self,
        sender_ids: &str,
        app_version: i32,
        token: &str,
    ) -> Result<(), StoreError>;
}
