//! The contract shared by every block store layer.

use std::any::Any;
use std::fmt;
use std::io;

use cryfs_utils::data::Data;

use crate::blockid::BlockId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum BlockStoreError {
    /// An I/O error other than "not found". Not recovered locally.
    Io(io::Error),
    /// An encryption-side crypto failure. Not recovered locally.
    /// (Decryption failures are not errors; `load` returns `None`.)
    Crypto,
}

impl fmt::Display for BlockStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "block store i/o error: {}", err),
            Self::Crypto => write!(f, "block store crypto error"),
        }
    }
}

impl std::error::Error for BlockStoreError {}

impl From<io::Error> for BlockStoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, BlockStoreError>;

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// One open block: an id plus a mutable payload buffer.
///
/// Methods take `&self`; each implementation serializes access to its buffer
/// internally, so two handles to the same underlying block (as handed out by
/// the parallel-access layer) can be used from different threads.
///
/// Dropping a block writes pending changes down through the layers. Flush
/// errors during drop are logged, not propagated; call [`Block::flush`]
/// explicitly where the caller needs to see them.
pub trait Block: Send + Sync + 'static {
    fn key(&self) -> BlockId;

    /// Logical payload size. Each layer transforms the payload the layer
    /// below sees, so this differs from the physical size on disk.
    fn size(&self) -> usize;

    /// A copy of the current payload.
    fn data(&self) -> Data;

    /// Copy `target.len()` payload bytes starting at `offset` into `target`.
    /// Panics if the range is out of bounds.
    fn read(&self, target: &mut [u8], offset: usize);

    /// Overwrite payload bytes at `offset`. The written range must lie
    /// within the current size; panics otherwise. Use [`Block::resize`] to
    /// grow first.
    fn write(&self, source: &[u8], offset: usize);

    /// Grow (zero-padded) or shrink the payload.
    fn resize(&self, new_size: usize);

    /// Push the current contents through all layers to durable storage.
    /// An fsync is not implied; the leaf store relies on OS flushing.
    fn flush(&self) -> Result<()>;

    /// Downcast support for layer-internal `remove` implementations.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

// ---------------------------------------------------------------------------
// BlockStore
// ---------------------------------------------------------------------------

/// The store contract implemented by every layer.
///
/// A store must outlive every block it has handed out; layers that need a
/// back reference for deferred writes hold one into shared internals, so
/// this holds by construction.
pub trait BlockStore: Send + Sync + 'static {
    /// Allocate a fresh id without creating a block.
    fn create_key(&self) -> BlockId;

    /// Create a block under `id`. `Ok(None)` if a block with this id
    /// already exists.
    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>>;

    /// `Ok(None)` if the block does not exist or fails its integrity check.
    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>>;

    /// Delete a block and reclaim its storage. Requires exclusive
    /// ownership of the block.
    fn remove(&self, block: Box<dyn Block>) -> Result<()>;

    /// Best-effort count of existing blocks.
    fn num_blocks(&self) -> Result<u64>;

    /// Logical block size for a given physical size at the leaf, so
    /// callers can reason about per-layer overhead.
    fn block_size_from_physical_size(&self, physical_size: u64) -> u64;

    /// Inverse of [`BlockStore::block_size_from_physical_size`].
    fn physical_size_from_block_size(&self, block_size: u64) -> u64;

    /// Create a block under a fresh random id, retrying on the (unlikely)
    /// id collision.
    fn create(&self, data: &Data) -> Result<Box<dyn Block>> {
        loop {
            let id = self.create_key();
            if let Some(block) = self.try_create(&id, data.copy())? {
                return Ok(block);
            }
        }
    }
}

// Stores are often shared; a shared handle is a store as well.
impl<T: BlockStore + ?Sized> BlockStore for std::sync::Arc<T> {
    fn create_key(&self) -> BlockId {
        (**self).create_key()
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        (**self).try_create(id, data)
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        (**self).load(id)
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        (**self).remove(block)
    }

    fn num_blocks(&self) -> Result<u64> {
        (**self).num_blocks()
    }

    fn block_size_from_physical_size(&self, physical_size: u64) -> u64 {
        (**self).block_size_from_physical_size(physical_size)
    }

    fn physical_size_from_block_size(&self, block_size: u64) -> u64 {
        (**self).physical_size_from_block_size(block_size)
    }
}
