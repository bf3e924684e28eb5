//! Shared data types.
//!
//! - [`encoding`]: little-endian binary encoding traits used by the object format

pub mod encoding;
