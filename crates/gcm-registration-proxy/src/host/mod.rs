//! Host environment queries.

mod fs;

pub use fs::FsHost;

use std::io;

#[cfg(test)]
use mockall::automock;

/// What the proxy needs from the hosting application.
#[cfg_attr(test, automock)]
pub trait HostEnvironment: Send + Sync {
    /// Version code of the installed application.
    fn version_code(&self) -> io::Result<i32>;

    /// Contents of a bundled asset.
    fn open_asset(&self, name: &str) -> io::Result<String>;
}
