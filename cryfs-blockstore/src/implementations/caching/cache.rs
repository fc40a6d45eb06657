//! The LRU-with-timeout cache of currently-unused blocks.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use crate::blockid::BlockId;
use crate::interface::Block;

struct CacheEntry {
    last_access: Instant,
    block: Box<dyn Block>,
}

impl CacheEntry {
    fn new(block: Box<dyn Block>) -> CacheEntry {
        CacheEntry {
            last_access: Instant::now(),
            block,
        }
    }

    fn age(&self) -> Duration {
        self.last_access.elapsed()
    }
}

/// Bounded LRU map of released blocks. Entries are evicted when the cache
/// is full or when they exceed [`BlockCache::PURGE_LIFETIME`]; evicting an
/// entry drops its block, which writes pending changes down.
pub struct BlockCache {
    entries: Mutex<LruCache<BlockId, CacheEntry>>,
}

impl BlockCache {
    /// Upper bound on cached entries.
    pub const MAX_ENTRIES: usize = 1000;
    /// An entry older than this is purged by the next sweep.
    pub const PURGE_LIFETIME: Duration = Duration::from_millis(500);
    /// Interval of the background purge sweep.
    pub const PURGE_INTERVAL: Duration = Duration::from_millis(500);
    /// Oldest age an entry can reach under ideal purge scheduling.
    pub const MAX_LIFETIME: Duration =
        Duration::from_millis(Self::PURGE_LIFETIME.as_millis() as u64 + Self::PURGE_INTERVAL.as_millis() as u64);

    pub fn new() -> BlockCache {
        BlockCache {
            // Bound enforced manually in push() so we control when the
            // evicted block's destructor runs.
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Take a block out of the cache.
    pub fn pop(&self, id: &BlockId) -> Option<Box<dyn Block>> {
        let mut entries = self.entries.lock().unwrap();
        entries.pop(id).map(|entry| entry.block)
    }

    /// Insert a released block as the most recent entry, evicting the
    /// least recent one if the cache is full.
    pub fn push(&self, id: BlockId, block: Box<dyn Block>) {
        let evicted = {
            let mut entries = self.entries.lock().unwrap();
            debug_assert!(entries.len() <= Self::MAX_ENTRIES);
            let evicted = if entries.len() >= Self::MAX_ENTRIES {
                entries.pop_lru()
            } else {
                None
            };
            entries.put(id, CacheEntry::new(block));
            evicted
        };
        // The evicted block's destructor can do crypto and disk i/o;
        // run it without holding the cache lock.
        drop(evicted);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every entry older than [`BlockCache::PURGE_LIFETIME`]. Called
    /// by the periodic sweep.
    pub fn purge_expired(&self) {
        let purged = {
            let mut entries = self.entries.lock().unwrap();
            let mut purged: Vec<(BlockId, CacheEntry)> = Vec::new();
            while let Some((_, entry)) = entries.peek_lru() {
                if entry.age() <= Self::PURGE_LIFETIME {
                    break;
                }
                purged.push(entries.pop_lru().unwrap());
            }
            purged
        };
        if !purged.is_empty() {
            debug!(count = purged.len(), "purging timed-out cache entries");
        }
        drop(purged);
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::inmemory::InMemoryBlockStore;
    use crate::interface::BlockStore;
    use cryfs_utils::data::Data;

    fn make_block(store: &InMemoryBlockStore) -> Box<dyn Block> {
        store.create(&Data::new_zeroed(16)).unwrap()
    }

    #[test]
    fn pop_returns_pushed_block() {
        let store = InMemoryBlockStore::new();
        let cache = BlockCache::new();
        let block = make_block(&store);
        let id = block.key();
        cache.push(id, block);
        assert_eq!(1, cache.len());
        let popped = cache.pop(&id).unwrap();
        assert_eq!(id, popped.key());
        assert!(cache.is_empty());
    }

    #[test]
    fn pop_missing_is_none() {
        let cache = BlockCache::new();
        let store = InMemoryBlockStore::new();
        assert!(cache.pop(&store.create_key()).is_none());
    }

    #[test]
    fn bound_is_enforced() {
        let store = InMemoryBlockStore::new();
        let cache = BlockCache::new();
        let mut first_id = None;
        for _ in 0..BlockCache::MAX_ENTRIES + 10 {
            let block = make_block(&store);
            let id = block.key();
            first_id.get_or_insert(id);
            cache.push(id, block);
            assert!(cache.len() <= BlockCache::MAX_ENTRIES);
        }
        assert_eq!(BlockCache::MAX_ENTRIES, cache.len());
        // The oldest entries were evicted.
        assert!(cache.pop(&first_id.unwrap()).is_none());
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let store = InMemoryBlockStore::new();
        let cache = BlockCache::new();
        let old_block = make_block(&store);
        let old_id = old_block.key();
        cache.push(old_id, old_block);

        std::thread::sleep(BlockCache::PURGE_LIFETIME + Duration::from_millis(100));
        let fresh_block = make_block(&store);
        let fresh_id = fresh_block.key();
        cache.push(fresh_id, fresh_block);

        cache.purge_expired();
        assert!(cache.pop(&old_id).is_none());
        assert!(cache.pop(&fresh_id).is_some());
    }
}
