//! The single-instance coordination layer.
//!
//! Guarantees that across all concurrent callers, each block id has at most
//! one underlying in-memory block. Callers get lightweight [`BlockRef`]
//! handles that share the underlying block; the block is returned to the
//! layer below when the last handle drops. Concurrent loads of the same id
//! coalesce: one caller performs the base load, the others wait on it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use cryfs_utils::data::Data;

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, Result};

// ---------------------------------------------------------------------------
// Open-block bookkeeping
// ---------------------------------------------------------------------------

struct OpenBlockHandle {
    block: Box<dyn Block>,
}

enum OpenEntry {
    /// A base load for this id is in flight; waiters block on the condvar.
    Loading,
    /// The block is in memory, shared by `refcount` handles.
    Open {
        handle: Arc<OpenBlockHandle>,
        refcount: u32,
    },
}

struct OpenBlockList {
    entries: Mutex<HashMap<BlockId, OpenEntry>>,
    condition: Condvar,
}

impl OpenBlockList {
    fn new() -> Arc<OpenBlockList> {
        Arc::new(OpenBlockList {
            entries: Mutex::new(HashMap::new()),
            condition: Condvar::new(),
        })
    }

    /// Called when a [`BlockRef`] drops. Removes the entry once the last
    /// reference is gone; the underlying block is then dropped by the
    /// caller's handle, which triggers its deferred write.
    fn release(&self, id: &BlockId) {
        let mut entries = self.entries.lock().unwrap();
        let last_reference = match entries.get_mut(id) {
            Some(OpenEntry::Open { refcount, .. }) => {
                *refcount -= 1;
                *refcount == 0
            }
            _ => unreachable!("released a block that is not open"),
        };
        if last_reference {
            entries.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// ParallelAccessBlockStore
// ---------------------------------------------------------------------------

pub struct ParallelAccessBlockStore {
    base: Box<dyn BlockStore>,
    open_blocks: Arc<OpenBlockList>,
}

impl ParallelAccessBlockStore {
    pub fn new(base: Box<dyn BlockStore>) -> ParallelAccessBlockStore {
        ParallelAccessBlockStore {
            base,
            open_blocks: OpenBlockList::new(),
        }
    }

    fn new_ref(&self, id: BlockId, handle: Arc<OpenBlockHandle>) -> Box<dyn Block> {
        Box::new(BlockRef {
            id,
            handle: Some(handle),
            open_blocks: self.open_blocks.clone(),
        })
    }

    fn install(&self, id: BlockId, block: Box<dyn Block>) -> Box<dyn Block> {
        let handle = Arc::new(OpenBlockHandle { block });
        let mut entries = self.open_blocks.entries.lock().unwrap();
        let previous = entries.insert(
            id,
            OpenEntry::Open {
                handle: handle.clone(),
                refcount: 1,
            },
        );
        debug_assert!(matches!(previous, None | Some(OpenEntry::Loading)));
        drop(entries);
        self.new_ref(id, handle)
    }
}

impl BlockStore for ParallelAccessBlockStore {
    fn create_key(&self) -> BlockId {
        self.base.create_key()
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        let block = match self.base.try_create(id, data)? {
            Some(block) => block,
            None => return Ok(None),
        };
        Ok(Some(self.install(*id, block)))
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        enum Lookup {
            Found(Arc<OpenBlockHandle>),
            LoadInFlight,
            NotOpen,
        }

        let mut entries = self.open_blocks.entries.lock().unwrap();
        let mut waited = false;
        loop {
            let lookup = match entries.get_mut(id) {
                Some(OpenEntry::Open { handle, refcount }) => {
                    *refcount += 1;
                    Lookup::Found(handle.clone())
                }
                Some(OpenEntry::Loading) => Lookup::LoadInFlight,
                None => Lookup::NotOpen,
            };
            match lookup {
                Lookup::Found(handle) => {
                    drop(entries);
                    return Ok(Some(self.new_ref(*id, handle)));
                }
                Lookup::LoadInFlight => {
                    waited = true;
                    entries = self.open_blocks.condition.wait(entries).unwrap();
                }
                Lookup::NotOpen if waited => {
                    // The load we were waiting on failed; its result is
                    // ours too.
                    return Ok(None);
                }
                Lookup::NotOpen => break,
            }
        }

        // We are the loader for this id. Do the base i/o without holding
        // the store lock; concurrent loads for the same id wait above.
        entries.insert(*id, OpenEntry::Loading);
        drop(entries);
        let loaded = self.base.load(id);

        let mut entries = self.open_blocks.entries.lock().unwrap();
        match loaded {
            Ok(Some(block)) => {
                drop(entries);
                let result = self.install(*id, block);
                self.open_blocks.condition.notify_all();
                Ok(Some(result))
            }
            Ok(None) => {
                entries.remove(id);
                drop(entries);
                self.open_blocks.condition.notify_all();
                Ok(None)
            }
            Err(err) => {
                entries.remove(id);
                drop(entries);
                self.open_blocks.condition.notify_all();
                Err(err)
            }
        }
    }

    /// Remove a block. The caller must hold the only reference to it;
    /// removing a block somebody else still references is a programming
    /// error and panics.
    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        let mut block_ref = block
            .into_any()
            .downcast::<BlockRef>()
            .expect("ParallelAccessBlockStore::remove got a foreign block");
        let id = block_ref.id;
        // Detach the handle so the BlockRef drop does not double-release.
        let handle = block_ref.handle.take().expect("block already released");
        drop(block_ref);

        {
            let mut entries = self.open_blocks.entries.lock().unwrap();
            // Check before touching the map so a failed assertion leaves
            // the bookkeeping intact for the remaining references.
            let refcount = match entries.get(&id) {
                Some(OpenEntry::Open { refcount, .. }) => *refcount,
                _ => panic!("tried to remove block {} that is not open", id),
            };
            assert_eq!(
                1, refcount,
                "tried to remove block {} while it is still referenced",
                id
            );
            entries.remove(&id);
        }

        let underlying = match Arc::try_unwrap(handle) {
            Ok(handle) => handle.block,
            Err(_) => panic!("tried to remove block {} while it is still referenced", id),
        };
        self.base.remove(underlying)
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
// BlockRef
// ---------------------------------------------------------------------------

/// A lightweight handle to a shared underlying block. Reads and writes
/// through any handle of the same id hit the same buffer; the underlying
/// block serializes them with its internal lock.
struct BlockRef {
    id: BlockId,
    handle: Option<Arc<OpenBlockHandle>>,
    open_blocks: Arc<OpenBlockList>,
}

impl BlockRef {
    fn block(&self) -> &dyn Block {
        self.handle
            .as_ref()
            .expect("block already released")
            .block
            .as_ref()
    }
}

impl Block for BlockRef {
    fn key(&self) -> BlockId {
        self.id
    }

    fn size(&self) -> usize {
        self.block().size()
    }

    fn data(&self) -> Data {
        self.block().data()
    }

    fn read(&self, target: &mut [u8], offset: usize) {
        self.block().read(target, offset)
    }

    fn write(&self, source: &[u8], offset: usize) {
        self.block().write(source, offset)
    }

    fn resize(&self, new_size: usize) {
        self.block().resize(new_size)
    }

    fn flush(&self) -> Result<()> {
        self.block().flush()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Drop for BlockRef {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.open_blocks.release(&self.id);
            // If we were the last reference, the map entry is gone and
            // this drop destroys the underlying block, flushing it down.
            drop(handle);
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
    use std::thread;

    fn counting_store() -> (Arc<ActionCountingBlockStore>, Arc<ParallelAccessBlockStore>) {
        let counting = Arc::new(ActionCountingBlockStore::new(Box::new(
            InMemoryBlockStore::new(),
        )));
        let store = Arc::new(ParallelAccessBlockStore::new(Box::new(counting.clone())));
        (counting, store)
    }

    #[test]
    fn load_returns_same_underlying_instance() {
        let (counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();

        let second = store.load(&id).unwrap().unwrap();
        // Writes through one handle are visible through the other without
        // any flush in between.
        block.write(&[0xAB; 64], 0);
        assert_eq!(&[0xAB; 64], second.data().as_slice());
        // The block was created once and never loaded from base.
        assert_eq!(0, counting.loads());
    }

    #[test]
    fn base_load_happens_once_for_concurrent_loads() {
        let (counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(1024, 1)).unwrap();
        let id = block.key();
        drop(block);

        // One handle stays open for the whole test, so the underlying
        // block stays in memory and every concurrent load must coalesce
        // onto it.
        let held = store.load(&id).unwrap().unwrap();
        let expected = DataFixture::generate(1024, 1);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let expected = expected.copy();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let loaded = store.load(&id).unwrap().unwrap();
                        assert_eq!(expected, loaded.data());
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(1, counting.loads());
        drop(held);
    }

    #[test]
    fn sequential_loads_after_release_hit_base_each_time() {
        let (counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        drop(block);

        drop(store.load(&id).unwrap().unwrap());
        drop(store.load(&id).unwrap().unwrap());
        assert_eq!(2, counting.loads());
    }

    #[test]
    fn concurrent_loads_coalesce_while_held() {
        let (counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        drop(block);

        let first = store.load(&id).unwrap().unwrap();
        let second = store.load(&id).unwrap().unwrap();
        let third = store.load(&id).unwrap().unwrap();
        assert_eq!(1, counting.loads());
        drop((first, second, third));
    }

    #[test]
    fn load_missing_block_is_none() {
        let (_counting, store) = counting_store();
        assert!(store.load(&store.create_key()).unwrap().is_none());
    }

    #[test]
    fn remove_with_last_ref_succeeds() {
        let (_counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        store.remove(block).unwrap();
        assert!(store.load(&id).unwrap().is_none());
        assert_eq!(0, store.num_blocks().unwrap());
    }

    #[test]
    #[should_panic(expected = "still referenced")]
    fn remove_with_outstanding_ref_panics() {
        let (_counting, store) = counting_store();
        let block = store.create(&DataFixture::generate(64, 1)).unwrap();
        let id = block.key();
        let _second = store.load(&id).unwrap().unwrap();
        let _ = store.remove(block);
    }

    #[test]
    fn writes_flush_down_when_last_ref_drops() {
        let (_counting, store) = counting_store();
        let block = store.create(&Data::new_zeroed(8)).unwrap();
        let id = block.key();
        let second = store.load(&id).unwrap().unwrap();
        block.write(&[5; 8], 0);
        drop(block);
        // Still open through `second`; writes stay visible.
        assert_eq!(&[5; 8], second.data().as_slice());
        drop(second);

        let reloaded = store.load(&id).unwrap().unwrap();
        assert_eq!(&[5; 8], reloaded.data().as_slice());
    }
}
