//! Symmetric ciphers and password-based key derivation.

pub mod kdf;
pub mod symmetric;
