//! The per-host record of which filesystem lives in which base directory.
//!
//! A JSON file mapping the canonical base-directory path to the filesystem
//! id and a hash of the last-seen inner encryption key. A mismatch on
//! reopen means somebody swapped the filesystem (or its config file) under
//! this path. Saving replaces the file atomically, so a crash leaves the
//! previous version intact.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cryfs_utils::crypto::symmetric::EncryptionKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::FilesystemId;

use super::LocalStateDir;

#[derive(Serialize, Deserialize)]
struct BasedirEntry {
    filesystem_id: String,
    encryption_key_hash: String,
}

#[derive(Default, Serialize, Deserialize)]
struct BasedirMetadataContent {
    basedirs: HashMap<String, BasedirEntry>,
}

pub struct BasedirMetadata {
    path: PathBuf,
    content: BasedirMetadataContent,
}

impl BasedirMetadata {
    /// Load the metadata file, or start empty if there is none yet.
    pub fn load(local_state_dir: &LocalStateDir) -> io::Result<BasedirMetadata> {
        let path = local_state_dir.for_basedir_metadata()?;
        let content = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BasedirMetadataContent::default(),
            Err(err) => return Err(err),
        };
        Ok(BasedirMetadata { path, content })
    }

    /// `true` if no record exists for `basedir` or the recorded filesystem
    /// id matches.
    pub fn filesystem_id_for_basedir_is_correct(
        &self,
        basedir: &Path,
        filesystem_id: &FilesystemId,
    ) -> bool {
        match self.content.basedirs.get(&canonical_key(basedir)) {
            Some(entry) => entry.filesystem_id == filesystem_id.to_hex(),
            None => true,
        }
    }

    /// `true` if no record exists for `basedir` or the recorded encryption
    /// key hash matches.
    pub fn encryption_key_for_basedir_is_correct(
        &self,
        basedir: &Path,
        enc_key: &EncryptionKey,
    ) -> bool {
        match self.content.basedirs.get(&canonical_key(basedir)) {
            Some(entry) => entry.encryption_key_hash == hash_key(enc_key),
            None => true,
        }
    }

    /// Record (or overwrite) the entry for `basedir`.
    pub fn update_for_basedir(
        &mut self,
        basedir: &Path,
        filesystem_id: &FilesystemId,
        enc_key: &EncryptionKey,
    ) -> &mut Self {
        self.content.basedirs.insert(
            canonical_key(basedir),
            BasedirEntry {
                filesystem_id: filesystem_id.to_hex(),
                encryption_key_hash: hash_key(enc_key),
            },
        );
        self
    }

    /// Atomically replace the metadata file.
    pub fn save(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.content)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

fn canonical_key(basedir: &Path) -> String {
    let canonical = fs::canonicalize(basedir).unwrap_or_else(|_| basedir.to_path_buf());
    canonical.to_string_lossy().into_owned()
}

fn hash_key(enc_key: &EncryptionKey) -> String {
    hex::encode_upper(Sha256::digest(enc_key.as_bytes()))
}
