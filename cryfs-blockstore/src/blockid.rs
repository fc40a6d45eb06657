//! Block identifiers.

use std::fmt;

use cryfs_utils::data::{FixedSizeData, FromHexError};
use cryfs_utils::random::RandomGenerator;

/// Opaque 16-byte block identifier.
///
/// This is a key in the key→value sense ("access handle for a block"), not
/// an encryption key. Rendered as 32 uppercase hex characters for on-disk
/// file names and textual references. Equality and ordering are byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(FixedSizeData<16>);

impl BlockId {
    pub const BINARY_LENGTH: usize = 16;
    pub const STRING_LENGTH: usize = 32;

    /// A fresh id from the given randomness source.
    pub fn random(rng: &dyn RandomGenerator) -> BlockId {
        BlockId(FixedSizeData::random(rng))
    }

    pub fn from_hex(hex_str: &str) -> Result<BlockId, FromHexError> {
        Ok(BlockId(FixedSizeData::from_hex(hex_str)?))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_slice(source: &[u8]) -> BlockId {
        BlockId(FixedSizeData::from_slice(source))
    }

    pub fn data(&self) -> &[u8; 16] {
        self.0.data()
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.to_hex())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
