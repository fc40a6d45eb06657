//! In-memory store with the same contract as the on-disk store.
//!
//! Used as the leaf in tests and wherever persistence is not wanted. The
//! semantics mirror [`super::ondisk::OnDiskBlockStore`] exactly: open
//! blocks shadow the stored bytes and write back on flush/drop.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cryfs_utils::data::Data;
use cryfs_utils::random::{OsRandom, RandomGenerator};

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, Result};

type SharedBlockMap = Arc<Mutex<HashMap<BlockId, Data>>>;

pub struct InMemoryBlockStore {
    blocks: SharedBlockMap,
}

impl InMemoryBlockStore {
    pub fn new() -> InMemoryBlockStore {
        InMemoryBlockStore {
            blocks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn create_key(&self) -> BlockId {
        BlockId::random(&OsRandom)
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        let mut blocks = self.blocks.lock().unwrap();
        if blocks.contains_key(id) {
            return Ok(None);
        }
        blocks.insert(*id, data.copy());
        Ok(Some(Box::new(InMemoryBlock::new(
            *id,
            self.blocks.clone(),
            data,
        ))))
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        let blocks = self.blocks.lock().unwrap();
        Ok(blocks.get(id).map(|data| {
            Box::new(InMemoryBlock::new(*id, self.blocks.clone(), data.copy())) as Box<dyn Block>
        }))
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        let block = block
            .into_any()
            .downcast::<InMemoryBlock>()
            .expect("InMemoryBlockStore::remove got a foreign block");
        block.state.lock().unwrap().dirty = false;
        let id = block.id;
        drop(block);
        self.blocks.lock().unwrap().remove(&id);
        Ok(())
    }

    fn num_blocks(&self) -> Result<u64> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }

    fn block_size_from_physical_size(&self, physical_size: u64) -> u64 {
        physical_size
    }

    fn physical_size_from_block_size(&self, block_size: u64) -> u64 {
        block_size
    }
}

// ---------------------------------------------------------------------------
// InMemoryBlock
// ---------------------------------------------------------------------------

struct InMemoryBlockState {
    data: Data,
    dirty: bool,
}

struct InMemoryBlock {
    id: BlockId,
    blocks: SharedBlockMap,
    state: Mutex<InMemoryBlockState>,
}

impl InMemoryBlock {
    fn new(id: BlockId, blocks: SharedBlockMap, data: Data) -> InMemoryBlock {
        InMemoryBlock {
            id,
            blocks,
            state: Mutex::new(InMemoryBlockState { data, dirty: false }),
        }
    }

    fn write_back(&self, state: &mut InMemoryBlockState) {
        if state.dirty {
            self.blocks.lock().unwrap().insert(self.id, state.data.copy());
            state.dirty = false;
        }
    }
}

impl Block for InMemoryBlock {
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
        self.write_back(&mut state);
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Drop for InMemoryBlock {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        self.write_back(&mut state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
