//! Human-readable listing of a program image.
//!
//! ```text
//! Obj ver 1.0
//! DAT
//!   0    2312
//!   1    320
//! INS
//!   0    load 0
//!   2    eqzjp 7
//!   4    swap
//! ```
//!
//! The listing walks the declared instructions only; the appended halt byte is
//! an implementation detail of the loader and is not shown.

use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::ProgramImage;
use std::fmt::Write;

/// Renders the version, data segment and decoded instruction stream.
pub fn render(image: &ProgramImage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Obj ver {}", image.version());

    let _ = writeln!(out, "DAT");
    for (idx, word) in image.data().iter().enumerate() {
        let _ = writeln!(out, "{:3}    {}", idx, word);
    }

    let _ = writeln!(out, "INS");
    let code = image.code();
    let mut offset = 0;
    while offset < code.len() {
        let opcode = code[offset];
        let _ = write!(out, "{:3}    ", offset);
        match Instruction::try_from(opcode) {
            Err(_) => {
                let _ = writeln!(out, "??? 0x{:02X}", opcode);
                offset += 1;
            }
            Ok(instr) if instr.has_immediate() => {
                match code.get(offset + 1) {
                    Some(operand) => {
                        let _ = writeln!(out, "{} {}", instr.mnemonic(), operand);
                    }
                    None => {
                        let _ = writeln!(out, "{} ?", instr.mnemonic());
                    }
                }
                offset += 2;
            }
            Ok(instr) => {
                let _ = writeln!(out, "{}", instr.mnemonic());
                offset += 1;
            }
        }
    }
    out
}
