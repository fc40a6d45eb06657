//! Test helpers shared by the test suites of all store implementations.
//!
//! [`check_block_store_contract`] runs the behavior every [`BlockStore`]
//! must show, so each implementation's integration test is one call plus
//! its layer-specific cases.

use std::sync::atomic::{AtomicU32, Ordering};

use cryfs_utils::data::{Data, DataFixture};

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, Result};

// ---------------------------------------------------------------------------
// Counting wrapper
// ---------------------------------------------------------------------------

/// Forwards to a base store and counts the calls that reach it. Used to
/// assert caching and coalescing behavior of the layers above.
pub struct ActionCountingBlockStore {
    base: Box<dyn BlockStore>,
    loads: AtomicU32,
    creates: AtomicU32,
    removes: AtomicU32,
}

impl ActionCountingBlockStore {
    pub fn new(base: Box<dyn BlockStore>) -> ActionCountingBlockStore {
        ActionCountingBlockStore {
            base,
            loads: AtomicU32::new(0),
            creates: AtomicU32::new(0),
            removes: AtomicU32::new(0),
        }
    }

    pub fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> u32 {
        self.removes.load(Ordering::SeqCst)
    }
}

impl BlockStore for ActionCountingBlockStore {
    fn create_key(&self) -> BlockId {
        self.base.create_key()
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.base.try_create(id, data)
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.base.load(id)
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.base.remove(block)
    }

    fn num_blocks(&self) -> Result<u64> {
        self.base.num_blocks()
    }

    fn block_size_from_physical_size(&self, physical_size: u64) -> u64 {
        self.base.block_size_from_physical_size(physical_size)
    }

    fn physical_size_from_block_size(&self, block_size: u64) -> u64 {
        self.base.physical_size_from_block_size(block_size)
    }
}

// ---------------------------------------------------------------------------
// Generic contract suite
// ---------------------------------------------------------------------------

/// Run the full [`BlockStore`] contract against a store instance. The store
/// must be empty when passed in.
pub fn check_block_store_contract(store: &dyn BlockStore) {
    assert_eq!(0, store.num_blocks().unwrap());

    created_block_has_given_data(store);
    created_blocks_get_distinct_ids(store);
    try_create_with_existing_id_fails(store);
    load_missing_block_is_none(store);
    load_returns_written_data(store);
    resize_grows_and_shrinks(store);
    num_blocks_tracks_create_and_remove(store);
    removed_block_cannot_be_loaded(store);
    size_relations_are_inverse(store);
}

fn created_block_has_given_data(store: &dyn BlockStore) {
    let data = DataFixture::generate(1024, 1);
    let block = store.create(&data).unwrap();
    assert_eq!(1024, block.size());
    assert_eq!(data, block.data());
    store.remove(block).unwrap();
}

fn created_blocks_get_distinct_ids(store: &dyn BlockStore) {
    let a = store.create(&Data::new_zeroed(64)).unwrap();
    let b = store.create(&Data::new_zeroed(64)).unwrap();
    assert_ne!(a.key(), b.key());
    store.remove(a).unwrap();
    store.remove(b).unwrap();
}

fn try_create_with_existing_id_fails(store: &dyn BlockStore) {
    let block = store.create(&Data::new_zeroed(64)).unwrap();
    let id = block.key();
    drop(block);
    assert!(store.try_create(&id, Data::new_zeroed(64)).unwrap().is_none());
    let block = store.load(&id).unwrap().unwrap();
    store.remove(block).unwrap();
}

fn load_missing_block_is_none(store: &dyn BlockStore) {
    assert!(store.load(&store.create_key()).unwrap().is_none());
}

fn load_returns_written_data(store: &dyn BlockStore) {
    let block = store.create(&Data::new_zeroed(128)).unwrap();
    let id = block.key();
    let written = DataFixture::generate(128, 2);
    block.write(written.as_slice(), 0);
    block.flush().unwrap();
    drop(block);

    let loaded = store.load(&id).unwrap().unwrap();
    assert_eq!(written, loaded.data());

    let mut partial = [0u8; 16];
    loaded.read(&mut partial, 32);
    assert_eq!(&written.as_slice()[32..48], &partial);
    store.remove(loaded).unwrap();
}

fn resize_grows_and_shrinks(store: &dyn BlockStore) {
    let block = store.create(&DataFixture::generate(64, 3)).unwrap();
    let id = block.key();
    block.resize(128);
    assert_eq!(128, block.size());
    assert_eq!(
        &DataFixture::generate(64, 3),
        &Data::from(&block.data().as_slice()[..64])
    );
    assert!(block.data().as_slice()[64..].iter().all(|&b| b == 0));

    block.resize(16);
    assert_eq!(16, block.size());
    drop(block);

    let loaded = store.load(&id).unwrap().unwrap();
    assert_eq!(16, loaded.size());
    assert_eq!(
        &DataFixture::generate(64, 3).as_slice()[..16],
        loaded.data().as_slice()
    );
    store.remove(loaded).unwrap();
}

fn num_blocks_tracks_create_and_remove(store: &dyn BlockStore) {
    assert_eq!(0, store.num_blocks().unwrap());
    let a = store.create(&Data::new_zeroed(8)).unwrap();
    let b = store.create(&Data::new_zeroed(8)).unwrap();
    assert_eq!(2, store.num_blocks().unwrap());
    store.remove(a).unwrap();
    assert_eq!(1, store.num_blocks().unwrap());
    store.remove(b).unwrap();
    assert_eq!(0, store.num_blocks().unwrap());
}

fn removed_block_cannot_be_loaded(store: &dyn BlockStore) {
    let block = store.create(&Data::new_zeroed(8)).unwrap();
    let id = block.key();
    store.remove(block).unwrap();
    assert!(store.load(&id).unwrap().is_none());
}

fn size_relations_are_inverse(store: &dyn BlockStore) {
    for block_size in [0u64, 1, 1024, 32768] {
        let physical = store.physical_size_from_block_size(block_size);
        assert_eq!(block_size, store.block_size_from_physical_size(physical));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::inmemory::InMemoryBlockStore;

    #[test]
    fn counting_store_counts() {
        let store = ActionCountingBlockStore::new(Box::new(InMemoryBlockStore::new()));
        let block = store.create(&Data::new_zeroed(8)).unwrap();
        let id = block.key();
        drop(block);
        store.load(&id).unwrap().unwrap();
        assert_eq!(1, store.creates());
        assert_eq!(1, store.loads());
        assert_eq!(0, store.removes());
    }
}
