//! The persistent leaf store: one file per block under a base directory.

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cryfs_utils::data::Data;
use cryfs_utils::random::{OsRandom, RandomGenerator};
use tracing::error;

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, Result};

/// Stores each block as a file `<base>/<hex[0..2]>/<hex[2..32]>` (uppercase
/// hex of the block id). File contents are exactly the bytes this store was
/// given; all transformation happens in the layers above.
pub struct OnDiskBlockStore {
    base_dir: PathBuf,
}

impl OnDiskBlockStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> OnDiskBlockStore {
        OnDiskBlockStore {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, id: &BlockId) -> PathBuf {
        let hex = id.to_hex();
        self.base_dir.join(&hex[..2]).join(&hex[2..])
    }
}

impl BlockStore for OnDiskBlockStore {
    fn create_key(&self) -> BlockId {
        BlockId::random(&OsRandom)
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        let path = self.file_path(id);
        if path.exists() {
            return Ok(None);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        data.store_to_file(&path)?;
        Ok(Some(Box::new(OnDiskBlock::new(*id, path, data))))
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        let path = self.file_path(id);
        match Data::load_from_file(&path)? {
            Some(data) => Ok(Some(Box::new(OnDiskBlock::new(*id, path, data)))),
            None => Ok(None),
        }
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        let block = block
            .into_any()
            .downcast::<OnDiskBlock>()
            .expect("OnDiskBlockStore::remove got a foreign block");
        block.state.lock().unwrap().dirty = false;
        let path = block.path.clone();
        drop(block);
        fs::remove_file(path)?;
        Ok(())
    }

    fn num_blocks(&self) -> Result<u64> {
        let mut count = 0;
        for subdir in fs::read_dir(&self.base_dir)? {
            let subdir = subdir?;
            if !subdir.file_type()?.is_dir() {
                continue;
            }
            let prefix = match subdir.file_name().into_string() {
                Ok(prefix) => prefix,
                Err(_) => continue,
            };
            for file in fs::read_dir(subdir.path())? {
                let file = file?;
                let name = match file.file_name().into_string() {
                    Ok(name) => name,
                    Err(_) => continue,
                };
                if BlockId::from_hex(&format!("{}{}", prefix, name)).is_ok() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn block_size_from_physical_size(&self, physical_size: u64) -> u64 {
        physical_size
    }

    fn physical_size_from_block_size(&self, block_size: u64) -> u64 {
        block_size
    }
}

// ---------------------------------------------------------------------------
// OnDiskBlock
// ---------------------------------------------------------------------------

struct OnDiskBlockState {
    data: Data,
    dirty: bool,
}

/// An open on-disk block. The in-memory buffer shadows the file; writes go
/// to the buffer, and flush/drop write the whole buffer back.
struct OnDiskBlock {
    id: BlockId,
    path: PathBuf,
    state: Mutex<OnDiskBlockState>,
}

impl OnDiskBlock {
    fn new(id: BlockId, path: PathBuf, data: Data) -> OnDiskBlock {
        OnDiskBlock {
            id,
            path,
            state: Mutex::new(OnDiskBlockState { data, dirty: false }),
        }
    }

    fn store_to_disk(path: &Path, state: &mut OnDiskBlockState) -> std::io::Result<()> {
        if state.dirty {
            state.data.store_to_file(path)?;
            state.dirty = false;
        }
        Ok(())
    }
}

impl Block for OnDiskBlock {
    fn key(&self) -> BlockId {
        self.id
    }

    fn size(&self) -> usize {
        self.state.lock().unwrap().data.len()
    }

    fn data(&self) -> Data {
        self.state.lock().unwrap().data.copy()
    }

    fn read(&self, target: &mut [u8], offset: usize) {
        let state = self.state.lock().unwrap();
        target.copy_from_slice(&state.data.as_slice()[offset..offset + target.len()]);
    }

    fn write(&self, source: &[u8], offset: usize) {
        let mut state = self.state.lock().unwrap();
        assert!(
            offset <= state.data.len() && offset + source.len() <= state.data.len(),
            "write outside of valid block area"
        );
        state.data.as_mut_slice()[offset..offset + source.len()].copy_from_slice(source);
        state.dirty = true;
    }

    fn resize(&self, new_size: usize) {
        let mut state = self.state.lock().unwrap();
        state.data.resize(new_size);
        state.dirty = true;
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::store_to_disk(&self.path, &mut state)?;
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Drop for OnDiskBlock {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Err(err) = Self::store_to_disk(&self.path, &mut state) {
            error!(block = %self.id, "failed to write block back to disk: {}", err);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
