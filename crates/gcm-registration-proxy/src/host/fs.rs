//! Filesystem-backed host environment.

use super::HostEnvironment;
use std::io;
use std::path::PathBuf;

/// Host whose bundled assets live in a directory on disk.
#[derive(Debug, Clone)]
pub struct FsHost {
    asset_dir: PathBuf,
    version_code: i32,
}

impl FsHost {
    pub fn new(asset_dir: impl Into<PathBuf>, version_code: i32) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            version_code,
        }
    }
}

/// Asset names are plain file names; anything that could escape the asset
/// directory is rejected.
fn validate_asset_name(name: &str) -> io::Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid asset name: {:?}", name),
        ));
    }
    Ok(())
}

impl HostEnvironment for FsHost {
    fn version_code(&self) -> io::Result<i32> {
        Ok(self.version_code)
    }

    fn open_asset(&self, name: &str) -> io::Result<String> {
        validate_asset_name(name)?;
        std::fs::read_to_string(self.asset_dir.join(name))
    }
}
