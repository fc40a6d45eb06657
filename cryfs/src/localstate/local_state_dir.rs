//! Location of the per-host state.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::FilesystemId;

/// Root of this host's cryfs state (by default under the user's local data
/// directory). Everything in here is per-host, never synced with the
/// filesystem's base directory.
#[derive(Clone, Debug)]
pub struct LocalStateDir {
    app_dir: PathBuf,
}

impl LocalStateDir {
    pub fn new(app_dir: impl Into<PathBuf>) -> LocalStateDir {
        LocalStateDir {
            app_dir: app_dir.into(),
        }
    }

    /// The platform default, e.g. `~/.local/share/cryfs` on Linux.
    pub fn default_location() -> io::Result<LocalStateDir> {
        let data_dir = dirs::data_local_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no local data directory for this user",
            )
        })?;
        Ok(LocalStateDir::new(data_dir.join("cryfs")))
    }

    /// Directory holding per-filesystem state, keyed by filesystem id.
    /// Created on first use.
    pub fn for_filesystem_id(&self, filesystem_id: &FilesystemId) -> io::Result<PathBuf> {
        let path = self
            .app_dir
            .join("filesystems")
            .join(filesystem_id.to_hex());
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Path of the basedir metadata file. The parent directory is created
    /// on first use.
    pub fn for_basedir_metadata(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.app_dir)?;
        Ok(self.app_dir.join("basedirs.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryfs_utils::data::DataFixture;

    #[test]
    fn filesystem_dir_is_created_and_stable() {
        let tempdir = tempfile::tempdir().unwrap();
        let state_dir = LocalStateDir::new(tempdir.path().join("state"));
        let id = DataFixture::generate_fixed_size::<16>(1);
        let first = state_dir.for_filesystem_id(&id).unwrap();
        let second = state_dir.for_filesystem_id(&id).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn different_filesystems_get_different_dirs() {
        let tempdir = tempfile::tempdir().unwrap();
        let state_dir = LocalStateDir::new(tempdir.path().join("state"));
        let a = state_dir
            .for_filesystem_id(&DataFixture::generate_fixed_size::<16>(1))
            .unwrap();
        let b = state_dir
            .for_filesystem_id(&DataFixture::generate_fixed_size::<16>(2))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn basedir_metadata_path_is_inside_app_dir() {
        let tempdir = tempfile::tempdir().unwrap();
        let state_dir = LocalStateDir::new(tempdir.path().join("state"));
        let path = state_dir.for_basedir_metadata().unwrap();
        assert!(path.starts_with(tempdir.path().join("state")));
    }
}
