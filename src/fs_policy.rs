//! Output path handling shared by every stage that persists an artifact.
//!
//! Stages never create directories implicitly: the [`DirectoryPolicy`] passed
//! in decides whether a missing parent directory is created or reported.

use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use tracing::debug;

/// What to do when an output file's parent directory does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryPolicy {
    /// Create missing parent directories.
    #[default]
    Create,
    /// Fail when the parent directory is missing.
    RequireExisting,
}

impl DirectoryPolicy {
    /// Returns the stable string label used in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::RequireExisting => "require-existing",
        }
    }

    /// Parses a config label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "require-existing" => Some(Self::RequireExisting),
            _ => None,
        }
    }
}

/// Makes sure the parent directory of `path` exists according to `policy`.
///
/// # Errors
///
/// Returns [`ErrorKind::NotFound`] under [`DirectoryPolicy::RequireExisting`]
/// when the parent is missing, or the underlying error from directory creation.
pub fn prepare_output_path(path: &Path, policy: DirectoryPolicy) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }
    match policy {
        DirectoryPolicy::Create => {
            debug!(dir = %parent.display(), "creating output directory");
            fs::create_dir_all(parent)
        }
        DirectoryPolicy::RequireExisting => Err(io::Error::new(
            ErrorKind::NotFound,
            format!("output directory '{}' does not exist", parent.display()),
        )),
    }
}

/// Writes an artifact through `write`, replacing `path` only once writing succeeded.
///
/// Content goes to a sibling `.partial` file first and is renamed into place,
/// so a failed write never leaves a truncated artifact behind.
///
/// # Errors
///
/// Returns any error from directory preparation, the writer closure, or the rename.
pub fn write_artifact<F>(path: &Path, policy: DirectoryPolicy, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> io::Result<()>,
{
    prepare_output_path(path, policy)?;

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = std::path::PathBuf::from(partial);

    let result = fs::File::create(&partial).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });

    if let Err(err) = result {
        // Best-effort cleanup so a partially written file does not linger.
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    fs::rename(&partial, path)?;
    debug!(path = %path.display(), "artifact written");
    Ok(())
}
