//! The caching layer.
//!
//! Interposes a small LRU-with-timeout cache of *unused* blocks between the
//! caller and the base store: a block released by its caller goes into the
//! cache instead of straight down, and a load within the next half second
//! gets it back without touching the base store. The constants are tuned to
//! coalesce the repeated block accesses of a single filesystem operation,
//! not to be a long-term cache.

mod cache;

pub use cache::BlockCache;

use std::any::Any;
use std::sync::Arc;

use cryfs_utils::data::Data;
use cryfs_utils::thread::PeriodicTask;

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, Result};

// ---------------------------------------------------------------------------
// CachingBlockStore
// ---------------------------------------------------------------------------

pub struct CachingBlockStore {
    base: Box<dyn BlockStore>,
    cache: Arc<BlockCache>,
    // Owned by the store so the sweep stops when the store goes away.
    _purge_task: PeriodicTask,
}

impl CachingBlockStore {
    pub fn new(base: Box<dyn BlockStore>) -> CachingBlockStore {
        let cache = Arc::new(BlockCache::new());
        let sweep_cache = cache.clone();
        let purge_task = PeriodicTask::new("block-cache-purge", BlockCache::PURGE_INTERVAL, move || {
            sweep_cache.purge_expired();
        });
        CachingBlockStore {
            base,
            cache,
            _purge_task: purge_task,
        }
    }

    fn wrap(&self, block: Box<dyn Block>) -> Box<dyn Block> {
        Box::new(CachedBlock {
            inner: Some(block),
            cache: self.cache.clone(),
        })
    }
}

impl BlockStore for CachingBlockStore {
    fn create_key(&self) -> BlockId {
        self.base.create_key()
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        Ok(self.base.try_create(id, data)?.map(|block| self.wrap(block)))
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        if let Some(block) = self.cache.pop(id) {
            return Ok(Some(self.wrap(block)));
        }
        Ok(self.base.load(id)?.map(|block| self.wrap(block)))
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        let mut block = block
            .into_any()
            .downcast::<CachedBlock>()
            .expect("CachingBlockStore::remove got a foreign block");
        let inner = block.inner.take().expect("block already released");
        // In case a stale cache entry exists for this id, drop it too.
        let id = inner.key();
        drop(self.cache.pop(&id));
        self.base.remove(inner)
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
// CachedBlock
// ---------------------------------------------------------------------------

/// Wrapper handed to callers. Forwards everything to the underlying block
/// and re-inserts it into the cache when dropped.
struct CachedBlock {
    inner: Option<Box<dyn Block>>,
    cache: Arc<BlockCache>,
}

impl CachedBlock {
    fn inner(&self) -> &dyn Block {
        self.inner.as_deref().expect("block already released")
    }
}

impl Block for CachedBlock {
    fn key(&self) -> BlockId {
        self.inner().key()
    }

    fn size(&self) -> usize {
        self.inner().size()
    }

    fn data(&self) -> Data {
        self.inner().data()
    }

    fn read(&self, target: &mut [u8], offset: usize) {
        self.inner().read(target, offset)
    }

    fn write(&self, source: &[u8], offset: usize) {
        self.inner().write(source, offset)
    }

    fn resize(&self, new_size: usize) {
        self.inner().resize(new_size)
    }

    fn flush(&self) -> Result<()> {
        self.inner().flush()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Drop for CachedBlock {
    fn drop(&mut self) {
        if let Some(block) = self.inner.take() {
            self.cache.push(block.key(), block);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::inmemory::InMemoryBlockStore;
    use crate::testutils::ActionCountingBlockStore;
    use cryfs_utils::data::DataFixture;
    use std::time::Duration;

    fn counting_caching_store() -> (Arc<ActionCountingBlockStore>, CachingBlockStore) {
        let counting = Arc::new(ActionCountingBlockStore::new(Box::new(
            InMemoryBlockStore::new(),
        )));
        let store = CachingBlockStore::new(Box::new(counting.clone()));
        (counting, store)
    }

    #[test]
    fn released_block_is_served_from_cache() {
        let (counting, store) = counting_caching_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        drop(block);

        let reloaded = store.load(&id).unwrap().unwrap();
        assert_eq!(id, reloaded.key());
        assert_eq!(0, counting.loads());
    }

    #[test]
    fn cache_times_out() {
        let (counting, store) = counting_caching_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        drop(block);

        std::thread::sleep(BlockCache::MAX_LIFETIME + Duration::from_millis(200));
        // The purge sweep has pushed the block down; the next load goes to
        // the base store and still sees the written contents.
        let reloaded = store.load(&id).unwrap().unwrap();
        assert_eq!(DataFixture::generate(64, 1), reloaded.data());
        assert_eq!(1, counting.loads());
    }

    #[test]
    fn writes_survive_the_cache() {
        let (_counting, store) = counting_caching_store();
        let block = store.create(&Data::new_zeroed(8)).unwrap();
        let id = block.key();
        block.write(&[7; 8], 0);
        drop(block);

        let reloaded = store.load(&id).unwrap().unwrap();
        assert_eq!(&[7; 8], reloaded.data().as_slice());
    }

    #[test]
    fn remove_evicts_cached_entry() {
        let (_counting, store) = counting_caching_store();
        let block = store.create(&Data::new_zeroed(8)).unwrap();
        let id = block.key();
        let reloaded = store.load(&id).unwrap().unwrap();
        store.remove(reloaded).unwrap();
        assert!(store.load(&id).unwrap().is_none());
        assert_eq!(0, store.num_blocks().unwrap());
        drop(block); // reinserting a removed id into the cache is harmless
    }

    #[test]
    fn num_blocks_is_delegated() {
        let (_counting, store) = counting_caching_store();
        let _a = store.create(&Data::new_zeroed(8)).unwrap();
        let _b = store.create(&Data::new_zeroed(8)).unwrap();
        assert_eq!(2, store.num_blocks().unwrap());
    }
}
