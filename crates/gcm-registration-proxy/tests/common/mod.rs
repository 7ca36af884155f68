//! Common test utilities for integration tests.

use async_trait::async_trait;
use gcm_registration_proxy::assets::CONFIGURATION_ASSET_FILE_NAME;
use gcm_registration_proxy::backend::MessagingBackend;
use gcm_registration_proxy::{BackendError, SenderIdSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Write the bundled configuration asset into `dir`.
pub fn write_configuration(dir: &Path, sender_ids: &str) {
    std::fs::write(
        dir.join(CONFIGURATION_ASSET_FILE_NAME),
        format!("sender.ids = \"{}\"\n", sender_ids),
    )
    .unwrap();
}

/// Backend that records every call in order.
pub struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    outcome: Result<String, BackendError>,
}

impl RecordingBackend {
    pub fn succeeding(token: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: Ok(token.to_string()),
        })
    }

    pub fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: Err(error),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingBackend for RecordingBackend {
    async fn register(&self, sender_ids: &SenderIdSet) -> Result<String, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("register:{}", sender_ids));
        self.outcome.clone()
    }

    async fn unregister(&self) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push("unregister".to_string());
        Ok(())
    }
}
