//! Binary encoding and decoding traits for the object file format.
//!
//! All multi-byte integers are little-endian. Fixed-size arrays are written
//! element by element with no length prefix, so a `#[derive(BinaryCodec)]`
//! struct of `u8`s and arrays has exactly the layout of its fields.
//!
//! # Example
//!
//! ```ignore
//! use crate::types::encoding::{Decode, Encode};
//!
//! let bytes = 42u32.to_bytes();
//! assert_eq!(bytes, [42, 0, 0, 0]);
//! assert_eq!(u32::decode(&mut bytes.as_slice()).unwrap(), 42);
//! ```

use imp_derive::Error;

/// Sink for writing encoded bytes.
pub trait EncodeSink {
    /// Writes the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Trait for types that can be serialized to binary format.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Serializes to a new byte buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Input ended before the expected data was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unexpected end of input: needed {requested} bytes, {available} available")]
pub struct DecodeError {
    /// Bytes the decoder asked for.
    pub requested: usize,
    /// Bytes that were left.
    pub available: usize,
}

/// Trait for types that can be deserialized from binary format.
pub trait Decode: Sized {
    /// Reads and decodes a value from the input buffer.
    ///
    /// Advances the input slice past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;
}

/// Reads exactly `n` bytes from the input, advancing the slice.
pub fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError {
            requested: n,
            available: input.len(),
        });
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(read_bytes(input, 1)?[0])
    }
}

impl Encode for u32 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_le_bytes());
    }
}

impl Decode for u32 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = read_bytes(input, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode(input)?);
        }
        items
            .try_into()
            .map_err(|items: Vec<T>| DecodeError {
                requested: N,
                available: items.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_is_little_endian() {
        assert_eq!(0x0403_0201u32.to_bytes(), vec![1, 2, 3, 4]);
        assert_eq!(u32::decode(&mut &[1u8, 2, 3, 4][..]).unwrap(), 0x0403_0201);
    }

    #[test]
    fn array_has_no_length_prefix() {
        assert_eq!(b"IMP".to_bytes(), b"IMP".to_vec());
        let mut input: &[u8] = b"IMPX";
        assert_eq!(<[u8; 3]>::decode(&mut input).unwrap(), *b"IMP");
        assert_eq!(input, b"X");
    }

    #[test]
    fn short_input_reports_eof() {
        let mut input: &[u8] = &[1, 2];
        assert_eq!(
            u32::decode(&mut input),
            Err(DecodeError {
                requested: 4,
                available: 2
            })
        );
    }

    #[test]
    fn read_bytes_advances_input() {
        let mut input: &[u8] = &[1, 2, 3];
        assert_eq!(read_bytes(&mut input, 2).unwrap(), &[1, 2]);
        assert_eq!(input, &[3]);
    }
}
