//! Compile-time-sized byte arrays with a hex codec.

use std::fmt;

use crate::random::RandomGenerator;

/// A byte array of compile-time size `N` with byte-wise equality and
/// ordering and an uppercase-hex textual form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedSizeData<const N: usize> {
    data: [u8; N],
}

/// Error parsing a hex string into a [`FixedSizeData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromHexError {
    WrongLength { expected: usize, actual: usize },
    InvalidHexDigit,
}

impl fmt::Display for FromHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength { expected, actual } => {
                write!(f, "expected {} hex characters, got {}", expected, actual)
            }
            Self::InvalidHexDigit => write!(f, "invalid hex digit"),
        }
    }
}

impl std::error::Error for FromHexError {}

impl<const N: usize> FixedSizeData<N> {
    pub const BINARY_LENGTH: usize = N;
    /// Length of the hex encoding.
    pub const STRING_LENGTH: usize = 2 * N;

    /// All-zero value.
    pub const fn null() -> Self {
        Self { data: [0; N] }
    }

    pub fn random(rng: &dyn RandomGenerator) -> Self {
        let mut result = Self::null();
        rng.fill(&mut result.data);
        result
    }

    /// Parse from a hex string. Accepts upper- and lowercase digits.
    pub fn from_hex(hex_str: &str) -> Result<Self, FromHexError> {
        if hex_str.len() != Self::STRING_LENGTH {
            return Err(FromHexError::WrongLength {
                expected: Self::STRING_LENGTH,
                actual: hex_str.len(),
            });
        }
        let mut result = Self::null();
        hex::decode_to_slice(hex_str, &mut result.data)
            .map_err(|_| FromHexError::InvalidHexDigit)?;
        Ok(result)
    }

    /// Uppercase hex encoding, `2 * N` characters.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.data)
    }

    /// Copy from a byte slice. Panics if the slice is not exactly `N` bytes.
    pub fn from_slice(source: &[u8]) -> Self {
        assert_eq!(N, source.len(), "wrong input size for FixedSizeData");
        let mut result = Self::null();
        result.data.copy_from_slice(source);
        result
    }

    pub const fn from_array(data: [u8; N]) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8; N] {
        &self.data
    }
}

impl<const N: usize> fmt::Debug for FixedSizeData<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl<const N: usize> fmt::Display for FixedSizeData<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
