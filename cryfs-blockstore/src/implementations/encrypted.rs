//! The encryption layer.
//!
//! Transforms each block before handing it to the base store. The plaintext
//! the cipher sees is `[ 16-byte block id | payload ]`; the id header binds
//! the ciphertext to its block id, so ciphertext copied under a different id
//! fails `load` even when the cipher itself (CFB) detects no tampering.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use cryfs_utils::crypto::symmetric::{
    Aes128Cfb, Aes128Gcm, Aes256Cfb, Aes256Gcm, Cast256Cfb, Cast256Gcm, Cipher, EncryptionKey,
    InvalidKeySize, Serpent256Cfb, Serpent256Gcm, Twofish256Cfb, Twofish256Gcm,
};
use cryfs_utils::data::Data;
use tracing::warn;

use crate::blockid::BlockId;
use crate::interface::{Block, BlockStore, BlockStoreError, Result};

/// Length of the block-id header prepended to the plaintext.
const HEADER_SIZE: usize = BlockId::BINARY_LENGTH;

// ---------------------------------------------------------------------------
// EncryptedBlockStore
// ---------------------------------------------------------------------------

/// Encrypts every block with `C` and binds each ciphertext to its block id
/// via the id header.
pub struct EncryptedBlockStore<C: Cipher> {
    base: Box<dyn BlockStore>,
    cipher: Arc<C>,
}

impl<C: Cipher> EncryptedBlockStore<C> {
    pub fn new(base: Box<dyn BlockStore>, key: EncryptionKey) -> std::result::Result<Self, InvalidKeySize> {
        Ok(EncryptedBlockStore {
            base,
            cipher: Arc::new(C::new(key)?),
        })
    }
}

impl<C: Cipher> BlockStore for EncryptedBlockStore<C> {
    fn create_key(&self) -> BlockId {
        self.base.create_key()
    }

    fn try_create(&self, id: &BlockId, data: Data) -> Result<Option<Box<dyn Block>>> {
        let plaintext = prepend_id_header(id, data);
        let ciphertext = self
            .cipher
            .encrypt(plaintext.as_slice())
            .map_err(|_| BlockStoreError::Crypto)?;
        let base_block = match self.base.try_create(id, ciphertext)? {
            Some(base_block) => base_block,
            None => return Ok(None),
        };
        Ok(Some(Box::new(EncryptedBlock::new(
            *id,
            self.cipher.clone(),
            base_block,
            plaintext,
        ))))
    }

    fn load(&self, id: &BlockId) -> Result<Option<Box<dyn Block>>> {
        let base_block = match self.base.load(id)? {
            Some(base_block) => base_block,
            None => return Ok(None),
        };
        let ciphertext = base_block.data();
        let plaintext = match self.cipher.decrypt(ciphertext.as_slice()) {
            Some(plaintext) => plaintext,
            None => {
                warn!(
                    block = %id,
                    "decrypting block failed - was it modified by an attacker?"
                );
                return Ok(None);
            }
        };
        if !id_header_is_correct(id, &plaintext) {
            // The id stored inside the block differs from the id it was
            // loaded under - an attacker might have swapped block contents.
            warn!(
                block = %id,
                "block has invalid id header - was it modified by an attacker?"
            );
            return Ok(None);
        }
        Ok(Some(Box::new(EncryptedBlock::new(
            *id,
            self.cipher.clone(),
            base_block,
            plaintext,
        ))))
    }

    fn remove(&self, block: Box<dyn Block>) -> Result<()> {
        let block = block
            .into_any()
            .downcast::<EncryptedBlock<C>>()
            .expect("EncryptedBlockStore::remove got a foreign block");
        let base_block = block.release_base_block();
        self.base.remove(base_block)
    }

    fn num_blocks(&self) -> Result<u64> {
        self.base.num_blocks()
    }

    fn block_size_from_physical_size(&self, physical_size: u64) -> u64 {
        let base_size = self.base.block_size_from_physical_size(physical_size);
        C::plaintext_size(base_size as usize)
            .and_then(|plaintext_size| plaintext_size.checked_sub(HEADER_SIZE))
            .unwrap_or(0) as u64
    }

    fn physical_size_from_block_size(&self, block_size: u64) -> u64 {
        self.base
            .physical_size_from_block_size(C::ciphertext_size(block_size as usize + HEADER_SIZE) as u64)
    }
}

fn prepend_id_header(id: &BlockId, data: Data) -> Data {
    let mut plaintext = Vec::with_capacity(HEADER_SIZE + data.len());
    plaintext.extend_from_slice(id.data());
    plaintext.extend_from_slice(data.as_slice());
    Data::from_vec(plaintext)
}

fn id_header_is_correct(id: &BlockId, plaintext: &Data) -> bool {
    plaintext.len() >= HEADER_SIZE && &plaintext.as_slice()[..HEADER_SIZE] == id.data()
}

// ---------------------------------------------------------------------------
// EncryptedBlock
// ---------------------------------------------------------------------------

struct EncryptedBlockState {
    // `None` only after the base block was released for removal.
    base_block: Option<Box<dyn Block>>,
    plaintext_with_header: Data,
    dirty: bool,
}

/// An open encrypted block. Holds the full plaintext plus a dirty bit;
/// re-encryption happens only on flush/drop, so repeated writes cost one
/// encryption, not one per write.
struct EncryptedBlock<C: Cipher> {
    id: BlockId,
    cipher: Arc<C>,
    state: Mutex<EncryptedBlockState>,
}

impl<C: Cipher> EncryptedBlock<C> {
    fn new(
        id: BlockId,
        cipher: Arc<C>,
        base_block: Box<dyn Block>,
        plaintext_with_header: Data,
    ) -> EncryptedBlock<C> {
        EncryptedBlock {
            id,
            cipher,
            state: Mutex::new(EncryptedBlockState {
                base_block: Some(base_block),
                plaintext_with_header,
                dirty: false,
            }),
        }
    }

    fn encrypt_to_base_block(&self, state: &mut EncryptedBlockState) -> Result<()> {
        if state.dirty {
            let ciphertext = self
                .cipher
                .encrypt(state.plaintext_with_header.as_slice())
                .map_err(|_| BlockStoreError::Crypto)?;
            let base_block = state.base_block.as_ref().expect("base block already released");
            base_block.resize(ciphertext.len());
            base_block.write(ciphertext.as_slice(), 0);
            state.dirty = false;
        }
        Ok(())
    }

    fn release_base_block(self: Box<Self>) -> Box<dyn Block> {
        let mut state = self.state.lock().unwrap();
        // The block is going away; no point re-encrypting pending writes.
        state.dirty = false;
        state.base_block.take().expect("base block already released")
    }
}

impl<C: Cipher> Block for EncryptedBlock<C> {
    fn key(&self) -> BlockId {
        self.id
    }

    fn size(&self) -> usize {
        self.state.lock().unwrap().plaintext_with_header.len() - HEADER_SIZE
    }

    fn data(&self) -> Data {
        let state = self.state.lock().unwrap();
        Data::from(&state.plaintext_with_header.as_slice()[HEADER_SIZE..])
    }

    fn read(&self, target: &mut [u8], offset: usize) {
        let state = self.state.lock().unwrap();
        let payload = &state.plaintext_with_header.as_slice()[HEADER_SIZE..];
        target.copy_from_slice(&payload[offset..offset + target.len()]);
    }

    fn write(&self, source: &[u8], offset: usize) {
        let mut state = self.state.lock().unwrap();
        let size = state.plaintext_with_header.len() - HEADER_SIZE;
        assert!(
            offset <= size && offset + source.len() <= size,
            "write outside of valid block area"
        );
        state.plaintext_with_header.as_mut_slice()
            [HEADER_SIZE + offset..HEADER_SIZE + offset + source.len()]
            .copy_from_slice(source);
        state.dirty = true;
    }

    fn resize(&self, new_size: usize) {
        let mut state = self.state.lock().unwrap();
        state.plaintext_with_header.resize(HEADER_SIZE + new_size);
        state.dirty = true;
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.encrypt_to_base_block(&mut state)?;
        state
            .base_block
            .as_ref()
            .expect("base block already released")
            .flush()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<C: Cipher> Drop for EncryptedBlock<C> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Err(err) = self.encrypt_to_base_block(&mut state) {
            tracing::error!(block = %self.id, "failed to re-encrypt block on close: {}", err);
        }
    }
}

// ---------------------------------------------------------------------------
// Cipher dispatch
// ---------------------------------------------------------------------------

/// Failure to build an encrypted store from a cipher name.
#[derive(Debug)]
pub enum CipherInstantiationError {
    UnknownCipher(String),
    InvalidKeySize(InvalidKeySize),
}

impl fmt::Display for CipherInstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCipher(name) => write!(f, "unknown cipher: {}", name),
            Self::InvalidKeySize(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CipherInstantiationError {}

impl From<InvalidKeySize> for CipherInstantiationError {
    fn from(err: InvalidKeySize) -> Self {
        Self::InvalidKeySize(err)
    }
}

/// Build an [`EncryptedBlockStore`] for a cipher chosen at runtime by its
/// canonical registry name.
pub fn new_encrypted_block_store(
    cipher_name: &str,
    key: EncryptionKey,
    base: Box<dyn BlockStore>,
) -> std::result::Result<Box<dyn BlockStore>, CipherInstantiationError> {
    macro_rules! instantiate {
        ($cipher:ty) => {
            Ok(Box::new(EncryptedBlockStore::<$cipher>::new(base, key)?))
        };
    }
    match cipher_name {
        "aes-256-gcm" => instantiate!(Aes256Gcm),
        "aes-128-gcm" => instantiate!(Aes128Gcm),
        "aes-256-cfb" => instantiate!(Aes256Cfb),
        "aes-128-cfb" => instantiate!(Aes128Cfb),
        "twofish-256-gcm" => instantiate!(Twofish256Gcm),
        "twofish-256-cfb" => instantiate!(Twofish256Cfb),
        "serpent-256-gcm" => instantiate!(Serpent256Gcm),
        "serpent-256-cfb" => instantiate!(Serpent256Cfb),
        "cast-256-gcm" => instantiate!(Cast256Gcm),
        "cast-256-cfb" => instantiate!(Cast256Cfb),
        _ => Err(CipherInstantiationError::UnknownCipher(
            cipher_name.to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
