//! GCM Registration Proxy - keeps a push registration token fresh.
//!
//! The proxy sits between an application and its push messaging backend to:
//! - Reuse the registration token stored by a previous run when it is still valid
//! - Re-register when the application version or configured senders change
//! - Persist the token from every successful registration

pub mod assets;
pub mod backend;
pub mod config;
pub mod error;
pub mod host;
pub mod registration;
pub mod sender_ids;

pub use config::Config;
pub use error::{BackendError, ProxyError};
pub use registration::{
    Callback, ChannelCallback, RegistrationEvent, RegistrationProxy, RegistrationTask, Resolution,
};
pub use sender_ids::SenderIdSet;
