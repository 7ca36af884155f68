//! Background registration unit of work.

use super::Callback;
use crate::backend::MessagingBackend;
use crate::error::ProxyError;
use crate::sender_ids::SenderIdSet;
use registration_store::TokenStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// One registration against the messaging backend.
///
/// When `unregister` is set the current registration is dropped first. The
/// outcome of that step is reported but never stops the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationTask {
    sender_ids: SenderIdSet,
    app_version: i32,
    unregister: bool,
}

impl RegistrationTask {
    /// Create a task, rejecting sender id sets unusable for registration.
    pub fn new(
        sender_ids: SenderIdSet,
        app_version: i32,
        unregister: bool,
    ) -> Result<Self, ProxyError> {
        sender_ids.validate()?;
        Ok(Self {
            sender_ids,
            app_version,
            unregister,
        })
    }

    /// Run the task on the tokio runtime.
    pub fn spawn(
        self,
        backend: Arc<dyn MessagingBackend>,
        store: Arc<dyn TokenStore>,
        callback: Arc<dyn Callback>,
    ) -> JoinHandle<Option<String>> {
        tokio::spawn(self.run(backend, store, callback))
    }

    /// Run the task to completion.
    ///
    /// Returns the new token, or `None` if registration failed. Either way
    /// the callback has been notified.
    #[instrument(
        skip_all,
        fields(
            sender_ids = %self.sender_ids,
            app_version = self.app_version,
            unregister = self.unregister
        )
    )]
    pub async fn run(
        self,
        backend: Arc<dyn MessagingBackend>,
        store: Arc<dyn TokenStore>,
        callback: Arc<dyn Callback>,
    ) -> Option<String> {
        if self.unregister {
            let result = backend.unregister().await;
            match &result {
                Ok(()) => info!("Unregistered from messaging backend"),
                Err(e) => warn!(error = %e, "Unregister failed, registering anyway"),
            }
            callback.unregistered(result.as_ref().map(|_| ()));
        }

        let registration_id = match backend.register(&self.sender_ids).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Registration failed");
                callback.registered(Err(&e));
                return None;
            }
        };

        info!("Registered with messaging backend");

        if let Err(e) = store
            .write_all(&self.sender_ids.format(), self.app_version, &registration_id)
            .await
        {
            error!(error = %e, "Failed to persist registration, it will be repeated next time");
        }

        callback.registered(Ok(&registration_id));
        Some(registration_id)
    }
}
