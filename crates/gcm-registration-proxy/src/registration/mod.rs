//! Registration token resolution.
//!
//! [`RegistrationProxy`] decides whether the stored token can be reused and,
//! when it cannot, schedules a [`RegistrationTask`] that talks to the
//! messaging backend. Outcomes are reported through a [`Callback`].

mod proxy;
mod task;

pub use proxy::{RegistrationProxy, Resolution};
pub use task::RegistrationTask;

use crate::error::BackendError;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives the outcome of a resolve.
///
/// `cached` and `restored` are terminal and exclude every other
/// notification. On the asynchronous paths `registered` fires exactly once,
/// preceded by at most one `unregistered`.
pub trait Callback: Send + Sync {
    /// The token held in memory by this proxy.
    fn cached(&self, registration_id: &str);

    /// A still-valid token read back from the store.
    fn restored(&self, registration_id: &str);

    /// Result of a backend registration.
    fn registered(&self, result: Result<&str, &BackendError>);

    /// Result of the backend unregistration preceding a re-registration.
    fn unregistered(&self, result: Result<(), &BackendError>);
}

/// A callback notification as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    Cached(String),
    Restored(String),
    Registered(Result<String, BackendError>),
    Unregistered(Result<(), BackendError>),
}

impl RegistrationEvent {
    /// Whether no further notification follows this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationEvent::Unregistered(_))
    }

    /// The token carried by a successful outcome.
    pub fn registration_id(&self) -> Option<&str> {
        match self {
            RegistrationEvent::Cached(id) | RegistrationEvent::Restored(id) => Some(id.as_str()),
            RegistrationEvent::Registered(Ok(id)) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Callback forwarding every notification into a channel.
#[derive(Clone)]
pub struct ChannelCallback {
    sender: mpsc::UnboundedSender<RegistrationEvent>,
}

impl ChannelCallback {
    /// Create a callback and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RegistrationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: RegistrationEvent) {
        if self.sender.send(event).is_err() {
            debug!("Registration event receiver dropped");
        }
    }
}

impl Callback for ChannelCallback {
    fn cached(&self, registration_id: &str) {
        self.send(RegistrationEvent::Cached(registration_id.to_string()));
    }

    fn restored(&self, registration_id: &str) {
        self.send(RegistrationEvent::Restored(registration_id.to_string()));
    }

    fn registered(&self, result: Result<&str, &BackendError>) {
        self.send(RegistrationEvent::Registered(
            result.map(String::from).map_err(Clone::clone),
        ));
    }

    fn unregistered(&self, result: Result<(), &BackendError>) {
        self.send(RegistrationEvent::Unregistered(result.map_err(Clone::clone)));
    }
}
