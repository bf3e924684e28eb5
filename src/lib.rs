//! imp library.
//!
//! Object loader, execution engine, assembler and lister for the imp
//! stack-machine instruction set.

pub mod types;
pub mod utils;
pub mod virtual_machine;
