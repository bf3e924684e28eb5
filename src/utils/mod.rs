//! Cross-cutting helpers.
//!
//! - [`log`]: leveled stderr logging macros

pub mod log;
