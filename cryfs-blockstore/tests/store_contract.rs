//! Runs the generic block store contract against every implementation and
//! against the composed stack.

use cryfs_blockstore::testutils::check_block_store_contract;
use cryfs_blockstore::{
    new_encrypted_block_store, BlockStore, CachingBlockStore, EncryptedBlockStore,
    InMemoryBlockStore, OnDiskBlockStore, ParallelAccessBlockStore,
};
use cryfs_utils::crypto::symmetric::{Aes256Gcm, Cipher, EncryptionKey};
use cryfs_utils::random::OsRandom;

#[test]
fn inmemory() {
    check_block_store_contract(&InMemoryBlockStore::new());
}

#[test]
fn ondisk() {
    let dir = tempfile::tempdir().unwrap();
    check_block_store_contract(&OnDiskBlockStore::new(dir.path()));
}

#[test]
fn encrypted() {
    let store = EncryptedBlockStore::<Aes256Gcm>::new(
        Box::new(InMemoryBlockStore::new()),
        Aes256Gcm::create_key(&OsRandom),
    )
    .unwrap();
    check_block_store_contract(&store);
}

#[test]
fn encrypted_with_unauthenticated_cipher() {
    let key = EncryptionKey::generate(&OsRandom, 32);
    let store =
        new_encrypted_block_store("aes-256-cfb", key, Box::new(InMemoryBlockStore::new())).unwrap();
    check_block_store_contract(store.as_ref());
}

#[test]
fn caching() {
    check_block_store_contract(&CachingBlockStore::new(Box::new(InMemoryBlockStore::new())));
}

#[test]
fn parallelaccess() {
    check_block_store_contract(&ParallelAccessBlockStore::new(Box::new(
        InMemoryBlockStore::new(),
    )));
}

#[test]
fn full_stack() {
    let dir = tempfile::tempdir().unwrap();
    let ondisk = Box::new(OnDiskBlockStore::new(dir.path()));
    let encrypted = Box::new(
        EncryptedBlockStore::<Aes256Gcm>::new(ondisk, Aes256Gcm::create_key(&OsRandom)).unwrap(),
    );
    let caching = Box::new(CachingBlockStore::new(encrypted));
    let stack = ParallelAccessBlockStore::new(caching);
    check_block_store_contract(&stack);
}

#[test]
fn full_stack_overhead_is_visible_in_size_relations() {
    let dir = tempfile::tempdir().unwrap();
    let ondisk = Box::new(OnDiskBlockStore::new(dir.path()));
    let encrypted = Box::new(
        EncryptedBlockStore::<Aes256Gcm>::new(ondisk, Aes256Gcm::create_key(&OsRandom)).unwrap(),
    );
    let caching = Box::new(CachingBlockStore::new(encrypted));
    let stack = ParallelAccessBlockStore::new(caching);

    let physical = stack.physical_size_from_block_size(32768);
    // 16 byte id header + 12 byte IV + 16 byte tag.
    assert_eq!(32768 + 16 + 12 + 16, physical);
}
