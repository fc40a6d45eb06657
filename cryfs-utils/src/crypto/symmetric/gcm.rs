//! Authenticated encryption: GCM over any 128-bit block cipher.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::AesGcm;
use cipher::consts::{U12, U16};
use cipher::{BlockCipher, BlockEncrypt, BlockSizeUser, Unsigned};

use crate::data::Data;
use crate::random::{PseudoRandom, RandomGenerator};

use super::{Cipher, CipherError, EncryptionKey, InvalidKeySize};

/// 96-bit IV, the AEAD-native nonce size for GCM.
const IV_SIZE: usize = 12;
/// 128-bit authentication tag appended to the ciphertext.
const TAG_SIZE: usize = 16;

/// GCM mode over the block cipher `C`.
///
/// Ciphertext layout: `[ IV(12) | ciphertext | tag(16) ]`. Decryption fails
/// on any modified byte, truncation, or wrong key.
pub struct GcmCipher<C>
where
    C: BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + KeyInit,
{
    inner: AesGcm<C, U12>,
}

impl<C> Cipher for GcmCipher<C>
where
    C: BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + KeyInit + Send + Sync + 'static,
{
    const KEY_SIZE: usize = <C::KeySize as Unsigned>::USIZE;

    fn new(key: EncryptionKey) -> Result<Self, InvalidKeySize> {
        key.check_size(Self::KEY_SIZE)?;
        let inner = AesGcm::<C, U12>::new_from_slice(key.as_bytes()).map_err(|_| InvalidKeySize {
            expected: Self::KEY_SIZE,
            actual: key.len(),
        })?;
        Ok(GcmCipher { inner })
    }

    fn ciphertext_size(plaintext_size: usize) -> usize {
        plaintext_size + IV_SIZE + TAG_SIZE
    }

    fn plaintext_size(ciphertext_size: usize) -> Option<usize> {
        ciphertext_size.checked_sub(IV_SIZE + TAG_SIZE)
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Data, CipherError> {
        let mut iv = [0u8; IV_SIZE];
        PseudoRandom.fill(&mut iv);
        let ciphertext = self
            .inner
            .encrypt(GenericArray::from_slice(&iv), plaintext)
            .map_err(|_| CipherError)?;

        let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
        result.extend_from_slice(&iv);
        result.extend_from_slice(&ciphertext);
        Ok(Data::from_vec(result))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Option<Data> {
        if ciphertext.len() < IV_SIZE + TAG_SIZE {
            return None;
        }
        let (iv, body) = ciphertext.split_at(IV_SIZE);
        self.inner
            .decrypt(GenericArray::from_slice(iv), body)
            .ok()
            .map(Data::from_vec)
    }
}
