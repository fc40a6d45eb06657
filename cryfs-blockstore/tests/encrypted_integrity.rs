//! Attacker-model tests for the encrypted layer over the on-disk store:
//! in-place tampering and block-swap attacks must make `load` return `None`.

use std::fs;
use std::path::PathBuf;

use cryfs_blockstore::{BlockId, BlockStore, EncryptedBlockStore, OnDiskBlockStore};
use cryfs_utils::crypto::symmetric::{Aes256Gcm, Cipher};
use cryfs_utils::data::Data;
use cryfs_utils::random::OsRandom;

fn encrypted_ondisk(dir: &std::path::Path) -> EncryptedBlockStore<Aes256Gcm> {
    EncryptedBlockStore::new(
        Box::new(OnDiskBlockStore::new(dir)),
        Aes256Gcm::create_key(&OsRandom),
    )
    .unwrap()
}

fn block_file_path(base: &std::path::Path, id: &BlockId) -> PathBuf {
    let hex = id.to_hex();
    base.join(&hex[..2]).join(&hex[2..])
}

#[test]
fn flipping_one_byte_on_disk_makes_load_fail() {
    let dir = tempfile::tempdir().unwrap();
    let store = encrypted_ondisk(dir.path());

    let id = BlockId::from_hex("1491BB4932A389EE14BC7090AC772972").unwrap();
    let payload = Data::from_vec(vec![0xAB; 1024]);
    let block = store.try_create(&id, payload).unwrap().unwrap();
    drop(block);

    let path = block_file_path(dir.path(), &id);
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    assert!(store.load(&id).unwrap().is_none());
}

#[test]
fn truncating_the_block_file_makes_load_fail() {
    let dir = tempfile::tempdir().unwrap();
    let store = encrypted_ondisk(dir.path());

    let block = store.create(&Data::from_vec(vec![0xAB; 1024])).unwrap();
    let id = block.key();
    drop(block);

    let path = block_file_path(dir.path(), &id);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..10]).unwrap();

    assert!(store.load(&id).unwrap().is_none());
}

#[test]
fn swapping_block_files_makes_both_loads_fail() {
    let dir = tempfile::tempdir().unwrap();
    let store = encrypted_ondisk(dir.path());

    let block_a = store.create(&Data::from_vec(vec![0xAA; 512])).unwrap();
    let block_b = store.create(&Data::from_vec(vec![0xBB; 512])).unwrap();
    let id_a = block_a.key();
    let id_b = block_b.key();
    drop(block_a);
    drop(block_b);

    let path_a = block_file_path(dir.path(), &id_a);
    let path_b = block_file_path(dir.path(), &id_b);
    let bytes_a = fs::read(&path_a).unwrap();
    let bytes_b = fs::read(&path_b).unwrap();
    fs::write(&path_a, &bytes_b).unwrap();
    fs::write(&path_b, &bytes_a).unwrap();

    // The ciphertexts themselves are intact, so the cipher decrypts them;
    // the id header check is what rejects both.
    assert!(store.load(&id_a).unwrap().is_none());
    assert!(store.load(&id_b).unwrap().is_none());
}

#[test]
fn copying_ciphertext_under_other_id_makes_load_fail() {
    let dir = tempfile::tempdir().unwrap();
    let store = encrypted_ondisk(dir.path());

    let block = store.create(&Data::from_vec(vec![0xCC; 256])).unwrap();
    let id = block.key();
    drop(block);

    // Place the ciphertext of `id` under a fresh id.
    let other_id = store.create_key();
    let source = block_file_path(dir.path(), &id);
    let target = block_file_path(dir.path(), &other_id);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::copy(&source, &target).unwrap();

    assert!(store.load(&other_id).unwrap().is_none());
    // The original is untouched and still loads.
    assert!(store.load(&id).unwrap().is_some());
}
