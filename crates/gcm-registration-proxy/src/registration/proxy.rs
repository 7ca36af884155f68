//! Registration proxy facade and the token freshness decision.

use super::{Callback, RegistrationTask};
use crate::assets::load_configured_sender_ids;
use crate::backend::MessagingBackend;
use crate::error::ProxyError;
use crate::host::HostEnvironment;
use crate::sender_ids::SenderIdSet;
use registration_store::TokenStore;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Which branch a resolve took.
#[derive(Debug)]
pub enum Resolution {
    /// Served from the in-memory token.
    Cached(String),
    /// Stored token was still valid.
    Restored(String),
    /// Registration scheduled in the background.
    Registering(JoinHandle<Option<String>>),
    /// Unregistration followed by registration scheduled in the background.
    ReRegistering(JoinHandle<Option<String>>),
}

impl Resolution {
    /// Whether the token was available without contacting the backend.
    pub fn is_immediate(&self) -> bool {
        matches!(self, Resolution::Cached(_) | Resolution::Restored(_))
    }

    /// Wait for the outcome and return the token, if one was obtained.
    pub async fn wait(self) -> Option<String> {
        match self {
            Resolution::Cached(id) | Resolution::Restored(id) => Some(id),
            Resolution::Registering(handle) | Resolution::ReRegistering(handle) => {
                match handle.await {
                    Ok(id) => id,
                    Err(e) => {
                        error!(error = %e, "Registration task did not complete");
                        None
                    }
                }
            }
        }
    }
}

enum Decision {
    Restore(String),
    Register,
    ReRegister,
}

/// Hands out the push registration token for this application.
///
/// Construct one per process and share it. The in-memory token is set the
/// first time a stored token is restored and is never cleared.
pub struct RegistrationProxy {
    backend: Arc<dyn MessagingBackend>,
    store: Arc<dyn TokenStore>,
    cached_registration_id: OnceLock<String>,
    /// Serializes the decision ladder across overlapping resolves.
    decision_lock: Mutex<()>,
}

impl RegistrationProxy {
    pub fn new(backend: Arc<dyn MessagingBackend>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            store,
            cached_registration_id: OnceLock::new(),
            decision_lock: Mutex::new(()),
        }
    }

    /// The token held in memory, if any.
    pub fn cached_registration_id(&self) -> Option<&str> {
        self.cached_registration_id.get().map(String::as_str)
    }

    /// Resolve the registration token for the application described by
    /// `host`, reporting the outcome through `callback`.
    ///
    /// Configuration, environment and storage problems are returned as
    /// errors before any background work starts. Backend failures are only
    /// ever reported through the callback.
    pub async fn get_registration_id(
        &self,
        host: &dyn HostEnvironment,
        callback: Arc<dyn Callback>,
    ) -> Result<Resolution, ProxyError> {
        if let Some(id) = self.cached_registration_id.get() {
            callback.cached(id);
            return Ok(Resolution::Cached(id.clone()));
        }

        let app_version = host
            .version_code()
            .map_err(|source| ProxyError::Environment {
                detail: "cannot resolve application version code".into(),
                source,
            })?;

        let configured = SenderIdSet::parse(&load_configured_sender_ids(host)?);
        debug!(sender_ids = %configured, "Configured sender id set");
        if configured.is_empty() {
            return Err(ProxyError::Configuration("empty sender id set".into()));
        }

        self.resolve(app_version, configured, callback).await
    }

    /// Run the decision ladder for an already-known configuration.
    #[instrument(skip(self, callback), fields(sender_ids = %configured))]
    pub async fn resolve(
        &self,
        app_version: i32,
        configured: SenderIdSet,
        callback: Arc<dyn Callback>,
    ) -> Result<Resolution, ProxyError> {
        if let Some(id) = self.cached_registration_id.get() {
            callback.cached(id);
            return Ok(Resolution::Cached(id.clone()));
        }

        configured.validate()?;

        let _guard = self.decision_lock.lock().await;

        // A resolve that held the lock before us may have restored.
        if let Some(id) = self.cached_registration_id.get() {
            callback.cached(id);
            return Ok(Resolution::Cached(id.clone()));
        }

        match self.decide(app_version, &configured).await? {
            Decision::Restore(id) => {
                info!("Restored stored registration id");
                callback.restored(&id);
                let _ = self.cached_registration_id.set(id.clone());
                Ok(Resolution::Restored(id))
            }
            Decision::Register => {
                let task = RegistrationTask::new(configured, app_version, false)?;
                Ok(Resolution::Registering(self.schedule(task, callback)))
            }
            Decision::ReRegister => {
                let task = RegistrationTask::new(configured, app_version, true)?;
                Ok(Resolution::ReRegistering(self.schedule(task, callback)))
            }
        }
    }

    fn schedule(
        &self,
        task: RegistrationTask,
        callback: Arc<dyn Callback>,
    ) -> JoinHandle<Option<String>> {
        task.spawn(self.backend.clone(), self.store.clone(), callback)
    }

    async fn decide(
        &self,
        app_version: i32,
        configured: &SenderIdSet,
    ) -> Result<Decision, ProxyError> {
        let Some(stored_sender_ids) = self.store.read_sender_ids().await? else {
            debug!("No stored sender ids");
            return Ok(Decision::Register);
        };
        if SenderIdSet::parse(&stored_sender_ids) != *configured {
            debug!(stored = %stored_sender_ids, "Stored sender id set differs from configured");
            return Ok(Decision::ReRegister);
        }

        let Some(stored_version) = self.store.read_app_version().await? else {
            debug!("No stored version code");
            return Ok(Decision::Register);
        };
        if stored_version != app_version {
            debug!(stored_version, app_version, "Version codes don't match");
            return Ok(Decision::Register);
        }

        let Some(stored_id) = self.store.read_token().await? else {
            debug!("No stored registration id");
            return Ok(Decision::Register);
        };

        Ok(Decision::Restore(stored_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockMessagingBackend;
    use crate::error::BackendError;
    use crate::host::MockHostEnvironment;
    use crate::registration::{ChannelCallback, RegistrationEvent};
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use registration_store::{MemoryStore, RegistrationRecord, StoreError};
    use std::io;

    mock! {
        pub Store {}

        #[async_trait]
        impl TokenStore for Store {
            async fn read_sender_ids(&self) -> Result<Option<String>, StoreError>;
            async fn read_app_version(&self) -> Result<Option<i32>, StoreError>;
            async fn read_token(&self) -> Result<Option<String>, StoreError>;
            async fn write_all(
                &self,
                sender_ids: &str,
                app_version: i32,
                token: &str,
            ) -> Result<(), StoreError>;
        }
    }

    fn silent_backend() -> MockMessagingBackend {
        let mut backend = MockMessagingBackend::new();
        backend.expect_register().never();
        backend.expect_unregister().never();
        backend
    }

    fn stored(ids: &str, version: i32, token: &str) -> MemoryStore {
        MemoryStore::with_record(RegistrationRecord::new(ids, version, token))
    }

    fn host(version: i32, asset: &'static str) -> MockHostEnvironment {
        let mut host = MockHostEnvironment::new();
        host.expect_version_code().returning(move || Ok(version));
        host.expect_open_asset()
            .returning(move |_| Ok(asset.to_string()));
        host
    }

    #[tokio::test]
    async fn test_restores_matching_registration() {
        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(stored("a,b", 5, "T")));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(5, SenderIdSet::parse("b, a"), Arc::new(callback))
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Restored(ref id) if id == "T"));
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Restored("T".into()));
        assert!(events.try_recv().is_err());
        assert_eq!(proxy.cached_registration_id(), Some("T"));
    }

    #[tokio::test]
    async fn test_second_resolve_uses_cache_without_store_access() {
        let mut store = MockStore::new();
        store
            .expect_read_sender_ids()
            .times(1)
            .returning(|| Ok(Some("a,b".into())));
        store.expect_read_app_version().times(1).returning(|| Ok(Some(5)));
        store
            .expect_read_token()
            .times(1)
            .returning(|| Ok(Some("T".into())));
        store.expect_write_all().never();

        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(store));
        let (callback, mut events) = ChannelCallback::new();
        let callback = Arc::new(callback);

        proxy
            .resolve(5, SenderIdSet::parse("a,b"), callback.clone())
            .await
            .unwrap();
        let second = proxy
            .resolve(5, SenderIdSet::parse("a,b"), callback.clone())
            .await
            .unwrap();
        let third = proxy
            .resolve(5, SenderIdSet::parse("a,b"), callback)
            .await
            .unwrap();

        assert!(matches!(second, Resolution::Cached(ref id) if id == "T"));
        assert!(third.is_immediate());
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Restored("T".into()));
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Cached("T".into()));
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Cached("T".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_resolves_restore_once() {
        const CALLERS: usize = 8;
        let proxy = Arc::new(RegistrationProxy::new(
            Arc::new(silent_backend()),
            Arc::new(stored("a", 1, "T")),
        ));

        let mut handles = Vec::with_capacity(CALLERS);
        for _ in 0..CALLERS {
            let proxy = proxy.clone();
            handles.push(tokio::spawn(async move {
                let (callback, mut events) = ChannelCallback::new();
                let resolution = proxy
                    .resolve(1, SenderIdSet::parse("a"), Arc::new(callback))
                    .await
                    .unwrap();
                let event = events.try_recv().unwrap();
                assert!(events.try_recv().is_err());
                (resolution, event)
            }));
        }

        let mut restored = 0;
        let mut cached = 0;
        for handle in handles {
            match handle.await.unwrap() {
                (Resolution::Restored(id), RegistrationEvent::Restored(event_id)) => {
                    assert_eq!((id.as_str(), event_id.as_str()), ("T", "T"));
                    restored += 1;
                }
                (Resolution::Cached(id), RegistrationEvent::Cached(event_id)) => {
                    assert_eq!((id.as_str(), event_id.as_str()), ("T", "T"));
                    cached += 1;
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(restored, 1);
        assert_eq!(cached, CALLERS - 1);
        assert_eq!(proxy.cached_registration_id(), Some("T"));
    }

    #[tokio::test]
    async fn test_nothing_stored_registers() {
        let mut backend = MockMessagingBackend::new();
        backend.expect_unregister().never();
        backend
            .expect_register()
            .with(eq(SenderIdSet::parse("a")))
            .times(1)
            .returning(|_| Ok("NEW".into()));

        let store = MemoryStore::new();
        let proxy = RegistrationProxy::new(Arc::new(backend), Arc::new(store.clone()));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(3, SenderIdSet::parse("a"), Arc::new(callback))
            .await
            .unwrap();
        assert!(matches!(resolution, Resolution::Registering(_)));
        assert_eq!(resolution.wait().await, Some("NEW".into()));

        assert_eq!(
            events.try_recv().unwrap(),
            RegistrationEvent::Registered(Ok("NEW".into()))
        );
        assert_eq!(store.record().await.version_code, Some(3));
        // Fresh registrations do not populate the in-memory token.
        assert_eq!(proxy.cached_registration_id(), None);
    }

    #[tokio::test]
    async fn test_sender_id_mismatch_reregisters() {
        let mut backend = MockMessagingBackend::new();
        let mut seq = mockall::Sequence::new();
        backend
            .expect_unregister()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        backend
            .expect_register()
            .with(eq(SenderIdSet::parse("a,c")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("T2".into()));

        let store = stored("a,b", 5, "T");
        let proxy = RegistrationProxy::new(Arc::new(backend), Arc::new(store.clone()));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(5, SenderIdSet::parse("a,c"), Arc::new(callback))
            .await
            .unwrap();
        assert!(matches!(resolution, Resolution::ReRegistering(_)));
        resolution.wait().await;

        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Unregistered(Ok(())));
        assert_eq!(
            events.try_recv().unwrap(),
            RegistrationEvent::Registered(Ok("T2".into()))
        );
        assert_eq!(store.record().await.sender_ids, Some("a,c".into()));
    }

    #[tokio::test]
    async fn test_version_mismatch_registers_without_unregister() {
        let mut backend = MockMessagingBackend::new();
        backend.expect_unregister().never();
        backend
            .expect_register()
            .times(1)
            .returning(|_| Ok("NEW".into()));

        let store = stored("a,b", 4, "T");
        let proxy = RegistrationProxy::new(Arc::new(backend), Arc::new(store.clone()));
        let (callback, _events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(5, SenderIdSet::parse("a,b"), Arc::new(callback))
            .await
            .unwrap();
        assert!(matches!(resolution, Resolution::Registering(_)));
        resolution.wait().await;

        let record = store.record().await;
        assert_eq!(record.sender_ids, Some("a,b".into()));
        assert_eq!(record.version_code, Some(5));
        assert_eq!(record.registration_id, Some("NEW".into()));
    }

    #[tokio::test]
    async fn test_missing_version_or_token_registers() {
        for record in [
            RegistrationRecord {
                sender_ids: Some("a".into()),
                registration_id: Some("T".into()),
                ..Default::default()
            },
            RegistrationRecord {
                sender_ids: Some("a".into()),
                version_code: Some(1),
                ..Default::default()
            },
        ] {
            let mut backend = MockMessagingBackend::new();
            backend.expect_unregister().never();
            backend.expect_register().times(1).returning(|_| Ok("NEW".into()));

            let proxy = RegistrationProxy::new(
                Arc::new(backend),
                Arc::new(MemoryStore::with_record(record)),
            );
            let (callback, _events) = ChannelCallback::new();

            let resolution = proxy
                .resolve(1, SenderIdSet::parse("a"), Arc::new(callback))
                .await
                .unwrap();
            assert!(matches!(resolution, Resolution::Registering(_)));
            assert_eq!(resolution.wait().await, Some("NEW".into()));
        }
    }

    #[tokio::test]
    async fn test_register_failure_reported_through_callback() {
        let mut backend = MockMessagingBackend::new();
        backend
            .expect_register()
            .returning(|_| Err(BackendError::Http("connection refused".into())));

        let store = stored("a", 4, "OLD");
        let proxy = RegistrationProxy::new(Arc::new(backend), Arc::new(store.clone()));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(5, SenderIdSet::parse("a"), Arc::new(callback))
            .await
            .unwrap();
        assert_eq!(resolution.wait().await, None);

        assert!(matches!(
            events.try_recv().unwrap(),
            RegistrationEvent::Registered(Err(BackendError::Http(_)))
        ));
        let record = store.record().await;
        assert_eq!(record.version_code, Some(4));
        assert_eq!(record.registration_id, Some("OLD".into()));
    }

    #[tokio::test]
    async fn test_persist_failure_still_reports_token() {
        let mut backend = MockMessagingBackend::new();
        backend.expect_register().returning(|_| Ok("NEW".into()));

        let mut store = MockStore::new();
        store.expect_read_sender_ids().returning(|| Ok(None));
        store
            .expect_write_all()
            .times(1)
            .returning(|_, _, _| Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full"))));

        let proxy = RegistrationProxy::new(Arc::new(backend), Arc::new(store));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .resolve(1, SenderIdSet::parse("a"), Arc::new(callback))
            .await
            .unwrap();
        assert_eq!(resolution.wait().await, Some("NEW".into()));
        assert_eq!(
            events.try_recv().unwrap(),
            RegistrationEvent::Registered(Ok("NEW".into()))
        );
    }

    #[tokio::test]
    async fn test_preconditions_checked_before_any_work() {
        let mut store = MockStore::new();
        store.expect_read_sender_ids().never();

        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(store));
        let (callback, mut events) = ChannelCallback::new();
        let callback = Arc::new(callback);

        let empty = proxy
            .resolve(1, SenderIdSet::default(), callback.clone())
            .await;
        assert!(matches!(empty, Err(ProxyError::Precondition(_))));

        let blank: SenderIdSet = ["a", " "].into_iter().collect();
        let blank = proxy.resolve(1, blank, callback).await;
        assert!(matches!(blank, Err(ProxyError::Precondition(_))));

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_error_is_returned() {
        let mut store = MockStore::new();
        store.expect_read_sender_ids().returning(|| {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")))
        });

        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(store));
        let (callback, _events) = ChannelCallback::new();

        let result = proxy
            .resolve(1, SenderIdSet::parse("a"), Arc::new(callback))
            .await;
        assert!(matches!(result, Err(ProxyError::Storage(_))));
    }

    #[tokio::test]
    async fn test_get_registration_id_reads_host() {
        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(stored("1,2", 9, "T")));
        let (callback, mut events) = ChannelCallback::new();

        let resolution = proxy
            .get_registration_id(&host(9, "sender.ids = \"2, 1\""), Arc::new(callback))
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Restored(_)));
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Restored("T".into()));
    }

    #[tokio::test]
    async fn test_get_registration_id_cached_skips_host() {
        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(stored("a", 1, "T")));
        let (callback, mut events) = ChannelCallback::new();
        let callback = Arc::new(callback);

        proxy
            .get_registration_id(&host(1, "sender.ids = \"a\""), callback.clone())
            .await
            .unwrap();

        let mut untouched = MockHostEnvironment::new();
        untouched.expect_version_code().never();
        untouched.expect_open_asset().never();
        let resolution = proxy
            .get_registration_id(&untouched, callback)
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Cached(_)));
        events.try_recv().unwrap();
        assert_eq!(events.try_recv().unwrap(), RegistrationEvent::Cached("T".into()));
    }

    #[tokio::test]
    async fn test_get_registration_id_empty_configuration() {
        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(MemoryStore::new()));
        let (callback, _events) = ChannelCallback::new();

        let result = proxy
            .get_registration_id(&host(1, "sender.ids = \" , \""), Arc::new(callback))
            .await;
        assert!(matches!(result, Err(ProxyError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_get_registration_id_environment_error() {
        let mut host = MockHostEnvironment::new();
        host.expect_version_code()
            .returning(|| Err(io::Error::new(io::ErrorKind::NotFound, "package not found")));
        host.expect_open_asset().never();

        let proxy = RegistrationProxy::new(Arc::new(silent_backend()), Arc::new(MemoryStore::new()));
        let (callback, _events) = ChannelCallback::new();

        let err = proxy
            .get_registration_id(&host, Arc::new(callback))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Environment { .. }));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "package not found");
    }
}
