//! Binary codec for on-disk records.
//!
//! Fixed-width integers are little-endian. Variable-size byte blobs carry a
//! `u64` length prefix, strings are NUL-terminated, and a serialization may
//! end with one unprefixed tail blob whose size is bounded by the record
//! itself. Serializer and Deserializer are exact inverses for valid input.

use std::fmt;

use super::Data;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// A write would exceed the preallocated record size.
    Overflow,
    /// The serializer finished without filling the preallocated record.
    SizeNotFullyUsed,
    /// A read ran past the end of the record.
    UnexpectedEnd,
    /// The deserializer finished with unread bytes left.
    NotFullyConsumed,
    /// A string contained an interior NUL byte or was missing its terminator.
    InvalidString,
    /// A string was not valid UTF-8.
    InvalidUtf8,
    /// A field held a value outside its domain (e.g. a boolean that is
    /// neither 0 nor 1).
    InvalidValue,
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "serialization failed: size overflow"),
            Self::SizeNotFullyUsed => write!(f, "serialization failed: size not fully used"),
            Self::UnexpectedEnd => write!(f, "deserialization failed: unexpected end of data"),
            Self::NotFullyConsumed => write!(f, "deserialization failed: trailing data"),
            Self::InvalidString => write!(f, "deserialization failed: invalid string"),
            Self::InvalidUtf8 => write!(f, "deserialization failed: invalid utf-8"),
            Self::InvalidValue => write!(f, "deserialization failed: value out of domain"),
        }
    }
}

impl std::error::Error for SerializationError {}

type Result<T> = std::result::Result<T, SerializationError>;

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// Writes a record of a size known up front. [`Serializer::finished`] fails
/// unless exactly that many bytes were written.
pub struct Serializer {
    result: Vec<u8>,
    size: usize,
}

macro_rules! write_int {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            self.write_raw(&value.to_le_bytes())
        }
    };
}

macro_rules! read_int {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.read_raw(std::mem::size_of::<$ty>())?;
            Ok(<$ty>::from_le_bytes(bytes.try_into().unwrap()))
        }
    };
}

impl Serializer {
    pub fn new(size: usize) -> Serializer {
        Serializer {
            result: Vec::with_capacity(size),
            size,
        }
    }

    write_int!(write_u8, u8);
    write_int!(write_i8, i8);
    write_int!(write_u16, u16);
    write_int!(write_i16, i16);
    write_int!(write_u32, u32);
    write_int!(write_i32, i32);
    write_int!(write_u64, u64);
    write_int!(write_i64, i64);

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(if value { 1 } else { 0 })
    }

    /// Length-prefixed byte blob.
    pub fn write_data(&mut self, data: &Data) -> Result<()> {
        self.write_u64(data.len() as u64)?;
        self.write_raw(data.as_slice())
    }

    /// NUL-terminated string. The string must not contain NUL bytes.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if value.as_bytes().contains(&0) {
            return Err(SerializationError::InvalidString);
        }
        self.write_raw(value.as_bytes())?;
        self.write_u8(0)
    }

    /// Blob of a size both sides know statically; no length prefix.
    pub fn write_fixed_data(&mut self, data: &[u8]) -> Result<()> {
        self.write_raw(data)
    }

    /// Unprefixed blob written as the last element. Must fill the record
    /// exactly to its end.
    pub fn write_tail_data(&mut self, data: &Data) -> Result<()> {
        if self.result.len() + data.len() != self.size {
            return Err(SerializationError::Overflow);
        }
        self.write_raw(data.as_slice())
    }

    pub fn finished(self) -> Result<Data> {
        if self.result.len() != self.size {
            return Err(SerializationError::SizeNotFullyUsed);
        }
        Ok(Data::from_vec(self.result))
    }

    /// Serialized size of a length-prefixed blob.
    pub fn data_size(data: &Data) -> usize {
        std::mem::size_of::<u64>() + data.len()
    }

    /// Serialized size of a NUL-terminated string.
    pub fn string_size(value: &str) -> usize {
        value.len() + 1
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if self.result.len() + bytes.len() > self.size {
            return Err(SerializationError::Overflow);
        }
        self.result.extend_from_slice(bytes);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deserializer
// ---------------------------------------------------------------------------

/// Reads a record written by [`Serializer`]. [`Deserializer::finished`]
/// fails unless the whole record was consumed.
pub struct Deserializer<'a> {
    source: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(source: &'a [u8]) -> Deserializer<'a> {
        Deserializer { source, pos: 0 }
    }

    read_int!(read_u8, u8);
    read_int!(read_i8, i8);
    read_int!(read_u16, u16);
    read_int!(read_i16, i16);
    read_int!(read_u32, u32);
    read_int!(read_i32, i32);
    read_int!(read_u64, u64);
    read_int!(read_i64, i64);

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerializationError::InvalidValue),
        }
    }

    pub fn read_data(&mut self) -> Result<Data> {
        let size = self.read_u64()? as usize;
        Ok(Data::from(self.read_raw(size)?))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.source[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(SerializationError::InvalidString)?;
        let bytes = self.read_raw(nul)?.to_vec();
        self.read_raw(1)?; // terminator
        String::from_utf8(bytes).map_err(|_| SerializationError::InvalidUtf8)
    }

    /// Blob of a size both sides know statically; no length prefix.
    pub fn read_fixed_data(&mut self, size: usize) -> Result<&'a [u8]> {
        self.read_raw(size)
    }

    /// Everything that is left in the record.
    pub fn read_tail_data(&mut self) -> Result<Data> {
        let size = self.source.len() - self.pos;
        Ok(Data::from(self.read_raw(size)?))
    }

    pub fn finished(self) -> Result<()> {
        if self.pos != self.source.len() {
            return Err(SerializationError::NotFullyConsumed);
        }
        Ok(())
    }

    fn read_raw(&mut self, size: usize) -> Result<&'a [u8]> {
        if self.pos + size > self.source.len() {
            return Err(SerializationError::UnexpectedEnd);
        }
        let result = &self.source[self.pos..self.pos + size];
        self.pos += size;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scalar_roundtrip() {
        let mut serializer = Serializer::new(1 + 2 + 4 + 8 + 1 + 2 + 4 + 8);
        serializer.write_u8(0xAB).unwrap();
        serializer.write_u16(0xABCD).unwrap();
        serializer.write_u32(0xABCDEF01).unwrap();
        serializer.write_u64(0xABCDEF0123456789).unwrap();
        serializer.write_i8(-1).unwrap();
        serializer.write_i16(-2).unwrap();
        serializer.write_i32(-3).unwrap();
        serializer.write_i64(-4).unwrap();
        let data = serializer.finished().unwrap();

        let mut deserializer = Deserializer::new(data.as_slice());
        assert_eq!(0xAB, deserializer.read_u8().unwrap());
        assert_eq!(0xABCD, deserializer.read_u16().unwrap());
        assert_eq!(0xABCDEF01, deserializer.read_u32().unwrap());
        assert_eq!(0xABCDEF0123456789, deserializer.read_u64().unwrap());
        assert_eq!(-1, deserializer.read_i8().unwrap());
        assert_eq!(-2, deserializer.read_i16().unwrap());
        assert_eq!(-3, deserializer.read_i32().unwrap());
        assert_eq!(-4, deserializer.read_i64().unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn integers_are_little_endian() {
        let mut serializer = Serializer::new(4);
        serializer.write_u32(0x01020304).unwrap();
        let data = serializer.finished().unwrap();
        assert_eq!(&[0x04, 0x03, 0x02, 0x01], data.as_slice());
    }

    #[test]
    fn data_roundtrip() {
        let payload = Data::from_vec(vec![1, 2, 3, 4, 5]);
        let mut serializer = Serializer::new(Serializer::data_size(&payload));
        serializer.write_data(&payload).unwrap();
        let record = serializer.finished().unwrap();

        let mut deserializer = Deserializer::new(record.as_slice());
        assert_eq!(payload, deserializer.read_data().unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn string_roundtrip() {
        let mut serializer = Serializer::new(Serializer::string_size("hello"));
        serializer.write_string("hello").unwrap();
        let record = serializer.finished().unwrap();

        let mut deserializer = Deserializer::new(record.as_slice());
        assert_eq!("hello", deserializer.read_string().unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn empty_string_roundtrip() {
        let mut serializer = Serializer::new(1);
        serializer.write_string("").unwrap();
        let record = serializer.finished().unwrap();
        let mut deserializer = Deserializer::new(record.as_slice());
        assert_eq!("", deserializer.read_string().unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn string_with_nul_is_rejected() {
        let mut serializer = Serializer::new(10);
        assert_eq!(
            Err(SerializationError::InvalidString),
            serializer.write_string("he\0llo")
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let mut deserializer = Deserializer::new(b"no terminator");
        assert_eq!(
            Err(SerializationError::InvalidString),
            deserializer.read_string()
        );
    }

    #[test]
    fn fixed_data_roundtrip() {
        let mut serializer = Serializer::new(4);
        serializer.write_fixed_data(&[1, 2, 3, 4]).unwrap();
        let record = serializer.finished().unwrap();
        let mut deserializer = Deserializer::new(record.as_slice());
        assert_eq!(&[1, 2, 3, 4], deserializer.read_fixed_data(4).unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn tail_data_roundtrip() {
        let tail = Data::from_vec(vec![9, 8, 7]);
        let mut serializer = Serializer::new(4 + 3);
        serializer.write_u32(42).unwrap();
        serializer.write_tail_data(&tail).unwrap();
        let record = serializer.finished().unwrap();

        let mut deserializer = Deserializer::new(record.as_slice());
        assert_eq!(42, deserializer.read_u32().unwrap());
        assert_eq!(tail, deserializer.read_tail_data().unwrap());
        deserializer.finished().unwrap();
    }

    #[test]
    fn tail_data_must_fill_record() {
        let mut serializer = Serializer::new(10);
        assert_eq!(
            Err(SerializationError::Overflow),
            serializer.write_tail_data(&Data::from_vec(vec![1, 2]))
        );
    }

    #[test]
    fn overflowing_write_fails() {
        let mut serializer = Serializer::new(2);
        assert_eq!(Err(SerializationError::Overflow), serializer.write_u32(1));
    }

    #[test]
    fn incomplete_serialization_fails() {
        let mut serializer = Serializer::new(8);
        serializer.write_u32(1).unwrap();
        assert_eq!(
            Err(SerializationError::SizeNotFullyUsed),
            serializer.finished()
        );
    }

    #[test]
    fn reading_past_end_fails() {
        let mut deserializer = Deserializer::new(&[1, 2]);
        assert_eq!(
            Err(SerializationError::UnexpectedEnd),
            deserializer.read_u32()
        );
    }

    #[test]
    fn trailing_bytes_fail_finished() {
        let deserializer = Deserializer::new(&[1, 2]);
        assert_eq!(
            Err(SerializationError::NotFullyConsumed),
            deserializer.finished()
        );
    }

    proptest! {
        #[test]
        fn prop_data_and_string_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..256),
                                          text in "[a-zA-Z0-9 ]{0,64}") {
            let payload = Data::from_vec(bytes);
            let size = Serializer::data_size(&payload) + Serializer::string_size(&text);
            let mut serializer = Serializer::new(size);
            serializer.write_data(&payload).unwrap();
            serializer.write_string(&text).unwrap();
            let record = serializer.finished().unwrap();

            let mut deserializer = Deserializer::new(record.as_slice());
            prop_assert_eq!(payload, deserializer.read_data().unwrap());
            prop_assert_eq!(text, deserializer.read_string().unwrap());
            deserializer.finished().unwrap();
        }
    }
}
