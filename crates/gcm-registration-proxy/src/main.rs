//! GCM Registration Proxy - Entry point.
//!
//! Resolves the registration token once and prints it to stdout.

use gcm_registration_proxy::{
    backend::HttpMessagingBackend, config::Config, host::FsHost, ChannelCallback,
    RegistrationEvent, RegistrationProxy,
};
use registration_store::{FileStore, MemoryStore, TokenStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting GCM Registration Proxy");

    // Initialize storage
    let store: Arc<dyn TokenStore> = if config.store.persist {
        info!("Using registration store in {:?}", config.store.dir);
        Arc::new(FileStore::new(&config.store.dir))
    } else {
        info!("Persistence disabled, using in-memory storage");
        Arc::new(MemoryStore::new())
    };

    // Initialize messaging backend
    let backend = match HttpMessagingBackend::new(
        &config.backend.api_url,
        &config.app.id,
        config.backend.timeout,
    ) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to create backend client: {}", e);
            std::process::exit(1);
        }
    };

    if !backend.health_check().await {
        warn!("Messaging backend at {} is not healthy", config.backend.api_url);
    }

    let proxy = RegistrationProxy::new(Arc::new(backend), store);
    let host = FsHost::new(&config.assets.dir, config.app.version_code);
    let (callback, mut events) = ChannelCallback::new();

    let resolution = match proxy.get_registration_id(&host, Arc::new(callback)).await {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to resolve registration id: {}", e);
            std::process::exit(1);
        }
    };

    let registration_id = resolution.wait().await;

    while let Ok(event) = events.try_recv() {
        match event {
            RegistrationEvent::Cached(_) => info!("Registration id served from memory"),
            RegistrationEvent::Restored(_) => info!("Registration id restored from store"),
            RegistrationEvent::Registered(Ok(_)) => info!("Registered with messaging backend"),
            RegistrationEvent::Registered(Err(e)) => error!("Registration failed: {}", e),
            RegistrationEvent::Unregistered(Ok(())) => info!("Unregistered previous registration"),
            RegistrationEvent::Unregistered(Err(e)) => warn!("Unregister failed: {}", e),
        }
    }

    match registration_id {
        Some(id) => println!("{}", id),
        None => std::process::exit(1),
    }
}
