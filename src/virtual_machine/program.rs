//! Object file format and the decoded program image.
//!
//! # Layout
//!
//! ```text
//! offset 0        : 3 bytes   magic marker
//! offset 3        : 1 byte    major version
//! offset 4        : 1 byte    minor version
//! offset 5        : 1 byte    data word count N_d
//! offset 6        : 1 byte    instruction byte count N_i
//! offset 7        : N_d * 4   data words (u32, little-endian)
//! offset 7 + 4N_d : N_i       instruction stream
//! ```
//!
//! The magic marker and version are informational. A mismatch is logged as a
//! warning and decoding carries on, so objects written by older or foreign
//! toolchains still load.

use crate::types::encoding::{Decode, DecodeError, Encode, read_bytes};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::warn;
use imp_derive::BinaryCodec;
use std::fmt;
use std::fs;
use std::path::Path;

/// Magic marker written by this toolchain.
pub const MAGIC: [u8; 3] = *b"IMP";

/// Object format version written by this toolchain.
pub const CURRENT_VERSION: Version = Version::new(1, 0);

/// Largest data or instruction segment a one-byte count can describe.
pub const MAX_SEGMENT_LEN: usize = u8::MAX as usize;

/// Size of the fixed header in bytes.
const HEADER_LEN: usize = 7;

/// Size of one data word in bytes.
const WORD_LEN: usize = 4;

/// Major/minor object format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// On-disk header, field for field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinaryCodec)]
struct Header {
    magic: [u8; 3],
    major: u8,
    minor: u8,
    data_count: u8,
    instruction_count: u8,
}

/// Maps a decoder shortfall to [`VMError::TruncatedInput`] for `section`.
fn truncated(section: &'static str) -> impl Fn(DecodeError) -> VMError {
    move |err| VMError::TruncatedInput {
        section,
        expected: err.requested,
        available: err.available,
    }
}

/// Decoded, immutable program: data segment, instruction segment and version.
///
/// The instruction segment always ends with one [`Instruction::Halt`] byte
/// past the declared instructions, so execution that runs off the end of the
/// program (or jumps exactly to its end) stops there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    magic: [u8; 3],
    version: Version,
    data: Vec<u32>,
    instructions: Vec<u8>,
}

impl ProgramImage {
    /// Builds an image from a data segment and declared instruction bytes.
    ///
    /// Returns [`VMError::SegmentTooLarge`] if either segment exceeds
    /// [`MAX_SEGMENT_LEN`].
    pub fn new(data: Vec<u32>, code: Vec<u8>) -> Result<Self, VMError> {
        if data.len() > MAX_SEGMENT_LEN {
            return Err(VMError::SegmentTooLarge {
                section: "data",
                len: data.len(),
            });
        }
        if code.len() > MAX_SEGMENT_LEN {
            return Err(VMError::SegmentTooLarge {
                section: "instruction",
                len: code.len(),
            });
        }
        Ok(Self::from_parts(MAGIC, CURRENT_VERSION, data, code))
    }

    fn from_parts(magic: [u8; 3], version: Version, data: Vec<u32>, mut code: Vec<u8>) -> Self {
        code.push(Instruction::Halt as u8);
        Self {
            magic,
            version,
            data,
            instructions: code,
        }
    }

    /// Returns a copy of this image stamped with `version`.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Data segment words, addressed `0..data().len()`.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Full instruction segment, including the trailing halt byte.
    pub fn instructions(&self) -> &[u8] {
        &self.instructions
    }

    /// Declared instruction bytes only.
    pub fn code(&self) -> &[u8] {
        &self.instructions[..self.instruction_count()]
    }

    /// Number of declared instruction bytes (`N_i`).
    pub fn instruction_count(&self) -> usize {
        self.instructions.len() - 1
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn magic(&self) -> [u8; 3] {
        self.magic
    }

    /// Serializes the image to the object file layout.
    ///
    /// The synthetic halt byte is not written; decoding appends it again.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = Header {
            magic: self.magic,
            major: self.version.major,
            minor: self.version.minor,
            data_count: self.data.len() as u8,
            instruction_count: self.instruction_count() as u8,
        };
        let mut out = Vec::with_capacity(
            HEADER_LEN + self.data.len() * WORD_LEN + self.instruction_count(),
        );
        header.encode(&mut out);
        for word in &self.data {
            word.encode(&mut out);
        }
        out.extend_from_slice(self.code());
        out
    }

    /// Decodes an object file.
    ///
    /// Fails with [`VMError::TruncatedInput`] if the input ends inside the
    /// header or a declared segment. Bytes after the instruction segment are
    /// ignored with a warning.
    pub fn from_bytes(mut input: &[u8]) -> Result<Self, VMError> {
        if input.len() < HEADER_LEN {
            return Err(VMError::TruncatedInput {
                section: "header",
                expected: HEADER_LEN,
                available: input.len(),
            });
        }
        let header = Header::decode(&mut input).map_err(truncated("header"))?;

        if header.magic != MAGIC {
            warn!(
                "unexpected magic marker {:02X?}, expected {:02X?}",
                header.magic, MAGIC
            );
        }
        let version = Version::new(header.major, header.minor);
        if version.major > CURRENT_VERSION.major {
            warn!(
                "object version {} is newer than supported version {}",
                version, CURRENT_VERSION
            );
        }

        let data_len = header.data_count as usize;
        let mut raw = read_bytes(&mut input, data_len * WORD_LEN).map_err(truncated("data segment"))?;
        let data = (0..data_len)
            .map(|_| u32::decode(&mut raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(truncated("data segment"))?;

        let code = read_bytes(&mut input, header.instruction_count as usize)
            .map_err(truncated("instruction segment"))?
            .to_vec();

        if !input.is_empty() {
            warn!(
                "ignoring {} trailing bytes after the instruction segment",
                input.len()
            );
        }

        Ok(Self::from_parts(header.magic, version, data, code))
    }

    /// Reads and decodes an object file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| VMError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Object bytes with the current magic and version.
    pub fn object_bytes(data: &[u32], code: &[u8]) -> Vec<u8> {
        let mut out = vec![b'I', b'M', b'P', 1, 0, data.len() as u8, code.len() as u8];
        for word in data {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(code);
        out
    }

    #[test]
    fn decode_layout() {
        let bytes = object_bytes(&[5, 0xDEAD_BEEF], &[0x02, 0x00, 0x18]);
        let image = ProgramImage::from_bytes(&bytes).unwrap();
        assert_eq!(image.magic(), MAGIC);
        assert_eq!(image.version(), Version::new(1, 0));
        assert_eq!(image.data(), &[5, 0xDEAD_BEEF]);
        assert_eq!(image.code(), &[0x02, 0x00, 0x18]);
        assert_eq!(image.instruction_count(), 3);
    }

    #[test]
    fn decode_appends_halt() {
        let image = ProgramImage::from_bytes(&object_bytes(&[7], &[0x17, 0x18])).unwrap();
        assert_eq!(image.data().len(), 1);
        assert_eq!(image.instructions().len(), 3);
        assert_eq!(image.instructions()[2], Instruction::Halt as u8);
    }

    #[test]
    fn decode_empty_program_still_has_halt() {
        let image = ProgramImage::from_bytes(&object_bytes(&[], &[])).unwrap();
        assert!(image.data().is_empty());
        assert_eq!(image.instructions(), &[Instruction::Halt as u8]);
        assert_eq!(image.instruction_count(), 0);
    }

    #[test]
    fn truncated_header() {
        for len in 0..HEADER_LEN {
            let bytes = &object_bytes(&[], &[])[..len];
            assert!(matches!(
                ProgramImage::from_bytes(bytes),
                Err(VMError::TruncatedInput { section: "header", expected: 7, available }) if available == len
            ));
        }
    }

    #[test]
    fn truncated_data_segment() {
        let bytes = object_bytes(&[1, 2], &[0x00]);
        // header + one and a half words
        let err = ProgramImage::from_bytes(&bytes[..HEADER_LEN + 6]).unwrap_err();
        assert!(matches!(
            err,
            VMError::TruncatedInput {
                section: "data segment",
                expected: 8,
                available: 6
            }
        ));
    }

    #[test]
    fn truncated_instruction_segment() {
        let bytes = object_bytes(&[1], &[0x17, 0x17, 0x09, 0x18]);
        let err = ProgramImage::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            VMError::TruncatedInput {
                section: "instruction segment",
                expected: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn every_prefix_of_an_object_is_truncated() {
        let bytes = object_bytes(&[3, 4], &[0x02, 0x00, 0x02, 0x01, 0x09, 0x18]);
        for len in 0..bytes.len() {
            assert!(matches!(
                ProgramImage::from_bytes(&bytes[..len]),
                Err(VMError::TruncatedInput { .. })
            ));
        }
        assert!(ProgramImage::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn foreign_magic_and_version_are_accepted() {
        let mut bytes = object_bytes(&[], &[0x00]);
        bytes[..3].copy_from_slice(b"XYZ");
        bytes[3] = 9;
        bytes[4] = 3;
        let image = ProgramImage::from_bytes(&bytes).unwrap();
        assert_eq!(image.magic(), *b"XYZ");
        assert_eq!(image.version(), Version::new(9, 3));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = object_bytes(&[], &[0x00]);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let image = ProgramImage::from_bytes(&bytes).unwrap();
        assert_eq!(image.code(), &[0x00]);
    }

    #[test]
    fn encode_matches_layout() {
        let image = ProgramImage::new(vec![2312, 320], vec![0x02, 0x00, 0x01])
            .unwrap()
            .with_version(Version::new(1, 2));
        let mut expected = object_bytes(&[2312, 320], &[0x02, 0x00, 0x01]);
        expected[4] = 2;
        assert_eq!(image.to_bytes(), expected);
        assert_eq!(ProgramImage::from_bytes(&image.to_bytes()).unwrap(), image);
    }

    #[test]
    fn new_rejects_oversized_segments() {
        assert!(matches!(
            ProgramImage::new(vec![0; 256], vec![]),
            Err(VMError::SegmentTooLarge { section: "data", len: 256 })
        ));
        assert!(matches!(
            ProgramImage::new(vec![], vec![0; 256]),
            Err(VMError::SegmentTooLarge { section: "instruction", len: 256 })
        ));
        assert!(ProgramImage::new(vec![0; 255], vec![0; 255]).is_ok());
    }

    #[test]
    fn version_display() {
        assert_eq!(Version::new(1, 0).to_string(), "1.0");
    }
}
