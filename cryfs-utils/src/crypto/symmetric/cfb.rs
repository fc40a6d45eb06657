//! Unauthenticated encryption: CFB over any block cipher.

use std::marker::PhantomData;

use cipher::{AsyncStreamCipher, BlockCipher, BlockEncrypt, KeyInit, KeyIvInit, Unsigned};

use crate::data::Data;
use crate::random::{PseudoRandom, RandomGenerator};

use super::{Cipher, CipherError, EncryptionKey, InvalidKeySize};

/// CFB mode over the block cipher `C`.
///
/// Ciphertext layout: `[ IV(blocksize) | ciphertext ]`. There is NO
/// authentication tag: decryption cannot detect tampering and happily
/// returns garbage for a modified ciphertext. Anything on top of this
/// cipher gets swap detection from the block-id header at best, never
/// in-place tamper detection. Offered for compatibility with existing
/// filesystems only.
pub struct CfbCipher<C>
where
    C: BlockCipher + BlockEncrypt + KeyInit,
{
    key: EncryptionKey,
    _block_cipher: PhantomData<C>,
}

impl<C> CfbCipher<C>
where
    C: BlockCipher + BlockEncrypt + KeyInit,
{
    const IV_SIZE: usize = <C::BlockSize as Unsigned>::USIZE;
}

impl<C> Cipher for CfbCipher<C>
where
    C: BlockCipher + BlockEncrypt + KeyInit + Send + Sync + 'static,
{
    const KEY_SIZE: usize = <C::KeySize as Unsigned>::USIZE;

    fn new(key: EncryptionKey) -> Result<Self, InvalidKeySize> {
        key.check_size(Self::KEY_SIZE)?;
        Ok(CfbCipher {
            key,
            _block_cipher: PhantomData,
        })
    }

    fn ciphertext_size(plaintext_size: usize) -> usize {
        plaintext_size + Self::IV_SIZE
    }

    fn plaintext_size(ciphertext_size: usize) -> Option<usize> {
        ciphertext_size.checked_sub(Self::IV_SIZE)
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Data, CipherError> {
        let mut iv = vec![0u8; Self::IV_SIZE];
        PseudoRandom.fill(&mut iv);

        let encryptor = cfb_mode::Encryptor::<C>::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|_| CipherError)?;
        let mut result = Vec::with_capacity(Self::IV_SIZE + plaintext.len());
        result.extend_from_slice(&iv);
        result.extend_from_slice(plaintext);
        encryptor.encrypt(&mut result[Self::IV_SIZE..]);
        Ok(Data::from_vec(result))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Option<Data> {
        if ciphertext.len() < Self::IV_SIZE {
            return None;
        }
        let (iv, body) = ciphertext.split_at(Self::IV_SIZE);
        let decryptor = cfb_mode::Decryptor::<C>::new_from_slices(self.key.as_bytes(), iv).ok()?;
        let mut plaintext = body.to_vec();
        decryptor.decrypt(&mut plaintext);
        Some(Data::from_vec(plaintext))
    }
}
