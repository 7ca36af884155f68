//! Messaging backend the proxy registers with.

mod http;

pub use http::HttpMessagingBackend;

use crate::error::BackendError;
use crate::sender_ids::SenderIdSet;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Push messaging service issuing registration tokens.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessagingBackend: Send + Sync {
    /// Register this application for the given senders, returning a token.
    async fn register(&self, sender_ids: &SenderIdSet) -> Result<String, BackendError>;

    /// Drop the current registration.
    async fn unregister(&self) -> Result<(), BackendError>;
}
