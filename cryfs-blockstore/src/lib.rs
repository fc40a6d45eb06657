//! Composable fixed-size block stores.
//!
//! A block is a `(BlockId, payload bytes)` pair. Every store in this crate
//! implements the same [`BlockStore`] contract, so stores compose by
//! ownership injection; the stack used by the filesystem is
//!
//! ```text
//! ParallelAccess( Caching( Encrypted<Cipher>( OnDisk ) ) )
//! ```
//!
//! where each layer adds one orthogonal property: persistence, encryption
//! with per-block binding, short-lived caching, and single-instance
//! coordination across concurrent callers.

pub mod blockid;
pub mod implementations;
pub mod interface;
pub mod testutils;
pub mod utils;

pub use blockid::BlockId;
pub use interface::{Block, BlockStore, BlockStoreError, Result};

pub use implementations::caching::CachingBlockStore;
pub use implementations::encrypted::{
    new_encrypted_block_store, CipherInstantiationError, EncryptedBlockStore,
};
pub use implementations::inmemory::InMemoryBlockStore;
pub use implementations::ondisk::OnDiskBlockStore;
pub use implementations::parallelaccess::ParallelAccessBlockStore;
