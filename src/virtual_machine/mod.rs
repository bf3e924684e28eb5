//! Stack-based bytecode virtual machine.
//!
//! Loads an object file into a [`program::ProgramImage`] and executes it with
//! [`vm::VM`] until the halt byte.
//!
//! # Architecture
//!
//! - **Data segment**: up to 255 `u32` words, read-only, addressed by `load`
//! - **Instruction segment**: up to 255 bytes, one opcode optionally followed
//!   by one immediate byte, plus an appended halt byte
//! - **Operand stack**: unbounded LIFO of `u32` words, the only working memory
//! - **Console**: `in` / `out` exchange unsigned integers line by line
//!
//! # Modules
//!
//! - [`assembler`]: Text assembler producing program images
//! - [`console`]: Console trait and stdio implementation
//! - [`errors`]: Decode, assembly and execution error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`listing`]: Human-readable program listing
//! - [`program`]: Object file format and program image
//! - [`stack`]: Operand stack
//! - [`vm`]: Execution engine

pub mod assembler;
pub mod console;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod listing;
pub mod program;
pub mod stack;
pub mod vm;
