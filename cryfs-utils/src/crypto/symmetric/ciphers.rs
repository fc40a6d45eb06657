//! The cipher registry: every supported block-cipher/mode combination under
//! its canonical name.

use super::{CfbCipher, Cipher, GcmCipher};

pub type Aes128Gcm = GcmCipher<aes::Aes128>;
pub type Aes256Gcm = GcmCipher<aes::Aes256>;
pub type Aes128Cfb = CfbCipher<aes::Aes128>;
pub type Aes256Cfb = CfbCipher<aes::Aes256>;

pub type Twofish256Gcm = GcmCipher<twofish::Twofish>;
pub type Twofish256Cfb = CfbCipher<twofish::Twofish>;

pub type Serpent256Gcm = GcmCipher<serpent::Serpent>;
pub type Serpent256Cfb = CfbCipher<serpent::Serpent>;

pub type Cast256Gcm = GcmCipher<cast6::Cast6>;
pub type Cast256Cfb = CfbCipher<cast6::Cast6>;

/// Registry entry for one cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherDescription {
    /// Canonical name as stored in config records.
    pub name: &'static str,
    /// Key size in bytes.
    pub key_size: usize,
    /// Whether decryption detects tampering. CFB entries do not; selecting
    /// one voids tamper detection for the whole filesystem.
    pub authenticated: bool,
}

/// All supported ciphers. The first entry is the default for new
/// filesystems.
pub const ALL_CIPHERS: &[CipherDescription] = &[
    CipherDescription {
        name: "aes-256-gcm",
        key_size: Aes256Gcm::KEY_SIZE,
        authenticated: true,
    },
    CipherDescription {
        name: "aes-128-gcm",
        key_size: Aes128Gcm::KEY_SIZE,
        authenticated: true,
    },
    CipherDescription {
        name: "twofish-256-gcm",
        key_size: Twofish256Gcm::KEY_SIZE,
        authenticated: true,
    },
    CipherDescription {
        name: "serpent-256-gcm",
        key_size: Serpent256Gcm::KEY_SIZE,
        authenticated: true,
    },
    CipherDescription {
        name: "cast-256-gcm",
        key_size: Cast256Gcm::KEY_SIZE,
        authenticated: true,
    },
    CipherDescription {
        name: "aes-256-cfb",
        key_size: Aes256Cfb::KEY_SIZE,
        authenticated: false,
    },
    CipherDescription {
        name: "aes-128-cfb",
        key_size: Aes128Cfb::KEY_SIZE,
        authenticated: false,
    },
    CipherDescription {
        name: "twofish-256-cfb",
        key_size: Twofish256Cfb::KEY_SIZE,
        authenticated: false,
    },
    CipherDescription {
        name: "serpent-256-cfb",
        key_size: Serpent256Cfb::KEY_SIZE,
        authenticated: false,
    },
    CipherDescription {
        name: "cast-256-cfb",
        key_size: Cast256Cfb::KEY_SIZE,
        authenticated: false,
    },
];

pub fn lookup_cipher(name: &str) -> Option<&'static CipherDescription> {
    ALL_CIPHERS.iter().find(|cipher| cipher.name == name)
}
