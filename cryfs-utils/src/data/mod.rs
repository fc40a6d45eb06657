//! Owned byte buffers and fixed-size byte arrays.

mod fixed;
mod fixture;
mod serializer;

pub use fixed::{FixedSizeData, FromHexError};
pub use fixture::DataFixture;
pub use serializer::{Deserializer, SerializationError, Serializer};

use std::fs;
use std::io;
use std::path::Path;

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// A contiguous owned byte buffer with explicit size.
///
/// Transfer is by move; copying is explicit via [`Data::copy`]. This is the
/// unit that flows through the block store layers: plaintext payloads,
/// ciphertexts and serialized config records are all `Data`.
#[derive(PartialEq, Eq, Debug, Default)]
pub struct Data(Vec<u8>);

impl Data {
    /// An owned buffer of `size` zero bytes.
    pub fn new_zeroed(size: usize) -> Data {
        Data(vec![0; size])
    }

    pub fn from_vec(bytes: Vec<u8>) -> Data {
        Data(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Explicit deep copy.
    pub fn copy(&self) -> Data {
        Data(self.0.clone())
    }

    pub fn fill_with_zeroes(&mut self) {
        self.0.fill(0);
    }

    /// Grow (zero-padded) or shrink the buffer to `new_size`.
    pub fn resize(&mut self, new_size: usize) {
        self.0.resize(new_size, 0);
    }

    /// Read a whole file into a buffer. `None` if the file does not exist.
    pub fn load_from_file(path: &Path) -> io::Result<Option<Data>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(Data(bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write the buffer to `path` atomically (write to a sibling temp file,
    /// then rename over the destination).
    pub fn store_to_file(&self, path: &Path) -> io::Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &self.0)?;
        fs::rename(&tmp, path)
    }

    /// Read a stream to its end into a buffer.
    pub fn load_from_reader(reader: &mut impl io::Read) -> io::Result<Data> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Data(bytes))
    }

    pub fn store_to_writer(&self, writer: &mut impl io::Write) -> io::Result<()> {
        writer.write_all(&self.0)
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Data {
        Data(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Data {
        Data(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Data {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
