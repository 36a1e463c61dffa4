//! Filesystem primitives shared by the stores.

use std::io::Write;
use std::path::Path;

use crate::error::{NscError, Result};

/// Write `data` to `path` atomically.
///
/// Creates the parent directory if it does not exist. The data goes to a
/// uniquely named temp file in the same directory, which is synced and then
/// renamed over `path`, so concurrent writers never share a temp file and
/// readers see either the old or the new content.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    restrict_permissions(tmp.path())?;

    tmp.persist(path).map_err(|e| NscError::Io(e.error))?;
    Ok(())
}

/// Plain overwrite, for derived artifacts that can be regenerated.
pub fn write_plain(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Read a file, mapping "does not exist" to `Ok(None)`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create `dir` (and parents) unless it exists. Fails when `dir` is a file.
pub fn maybe_make_dir(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(NscError::validation(
            "path",
            format!("{} is not a dir", dir.display()),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dir)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure `dir` exists and is a directory.
pub fn is_valid_dir(dir: &Path) -> Result<()> {
    let meta = std::fs::metadata(dir)?;
    if !meta.is_dir() {
        return Err(NscError::validation("path", "not a directory"));
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
