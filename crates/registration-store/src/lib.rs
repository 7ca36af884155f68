//! Persistent storage for push registration tokens.
//!
//! Holds the sender ids, application version code and registration token
//! from the last successful registration. Two backends are provided: a JSON
//! document on disk and a process-local in-memory store.

mod error;
mod file;
mod memory;
mod store;
mod types;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{TokenStore, NAMESPACE};
pub use types::RegistrationRecord;
