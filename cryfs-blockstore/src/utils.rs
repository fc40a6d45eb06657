//! Small helpers on top of the block store contract.

use cryfs_utils::data::Data;

use crate::interface::{Block, BlockStore, Result};

/// Create a new block (fresh random id) with the same contents as `source`.
pub fn copy_to_new_block(store: &dyn BlockStore, source: &dyn Block) -> Result<Box<dyn Block>> {
    store.create(&source.data())
}

/// Overwrite `target` with the contents of `source`, resizing as needed.
pub fn copy_to(target: &dyn Block, source: &dyn Block) {
    let data = source.data();
    if target.size() != data.len() {
        target.resize(data.len());
    }
    target.write(data.as_slice(), 0);
}

/// Overwrite the whole payload of `block` with zeroes.
pub fn fill_with_zeroes(block: &dyn Block) {
    let zeroes = Data::new_zeroed(block.size());
    block.write(zeroes.as_slice(), 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::inmemory::InMemoryBlockStore;
    use cryfs_utils::data::DataFixture;

    #[test]
    fn copy_to_new_block_copies_contents() {
        let store = InMemoryBlockStore::new();
        let source = store.create(&DataFixture::generate(128, 1)).unwrap();
        let copy = copy_to_new_block(&store, source.as_ref()).unwrap();
        assert_ne!(source.key(), copy.key());
        assert_eq!(source.data(), copy.data());
    }

    #[test]
    fn copy_to_overwrites_and_resizes() {
        let store = InMemoryBlockStore::new();
        let source = store.create(&DataFixture::generate(128, 1)).unwrap();
        let target = store.create(&Data::new_zeroed(16)).unwrap();
        copy_to(target.as_ref(), source.as_ref());
        assert_eq!(source.data(), target.data());
    }

    #[test]
    fn fill_with_zeroes_zeroes_payload() {
        let store = InMemoryBlockStore::new();
        let block = store.create(&DataFixture::generate(128, 1)).unwrap();
        fill_with_zeroes(block.as_ref());
        assert_eq!(Data::new_zeroed(128), block.data());
    }
}
