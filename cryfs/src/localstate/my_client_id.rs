//! The stable per-filesystem client id of this host.

use std::fs;
use std::io;
use std::path::Path;

use cryfs_utils::random::RandomGenerator;

const FILE_NAME: &str = "myClientId";

/// A random 32-bit id generated the first time this host opens a given
/// filesystem and reloaded on every later open. Used by the integrity
/// bookkeeping to tell this client's writes apart from other clients'.
pub struct MyClientId;

impl MyClientId {
    pub fn load_or_generate(
        filesystem_state_dir: &Path,
        rng: &dyn RandomGenerator,
    ) -> io::Result<u32> {
        let path = filesystem_state_dir.join(FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(content) => {
                if let Ok(client_id) = content.trim().parse::<u32>() {
                    return Ok(client_id);
                }
                // Corrupt id file; fall through and regenerate.
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let mut bytes = [0u8; 4];
        rng.fill(&mut bytes);
        let client_id = u32::from_le_bytes(bytes);
        fs::write(&path, client_id.to_string())?;
        Ok(client_id)
    }
}
