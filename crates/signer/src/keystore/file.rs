use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Write private key material readable and writable by the owner only.
///
/// A pre-existing file has its mode tightened before any bytes are written.
pub fn write_private_key(path: &Path, pem: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(pem.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

pub fn write_public_key(path: &Path, pem: &str) -> Result<()> {
    fs::write(path, pem)?;
    Ok(())
}
