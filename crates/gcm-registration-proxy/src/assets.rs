//! Bundled configuration asset.

use crate::error::ProxyError;
use crate::host::HostEnvironment;
use config::{Config, File, FileFormat};
use tracing::debug;

/// Name of the bundled asset carrying the sender id configuration.
pub const CONFIGURATION_ASSET_FILE_NAME: &str = "gcm-proxy.configuration.toml";

/// Property holding the comma-separated sender ids.
pub const KEY_SENDER_IDS: &str = "sender.ids";

/// Read the configured sender ids from the bundled asset.
///
/// The asset is a TOML property file, e.g. `sender.ids = "1234,5678"`.
pub fn load_configured_sender_ids(host: &dyn HostEnvironment) -> Result<String, ProxyError> {
    let contents = host.open_asset(CONFIGURATION_ASSET_FILE_NAME).map_err(|e| {
        ProxyError::Configuration(format!(
            "cannot open {}: {}",
            CONFIGURATION_ASSET_FILE_NAME, e
        ))
    })?;

    let properties = Config::builder()
        .add_source(File::from_str(&contents, FileFormat::Toml))
        .build()?;

    match properties.get_string(KEY_SENDER_IDS) {
        Ok(sender_ids) => {
            debug!(sender_ids = %sender_ids, "Configured sender ids");
            Ok(sender_ids)
        }
        Err(config::ConfigError::NotFound(_)) => Err(ProxyError::Configuration(format!(
            "no property for {}",
            KEY_SENDER_IDS
        ))),
        Err(e) => Err(e.into()),
    }
}
