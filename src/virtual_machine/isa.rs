//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical opcode table and hands it to a callback macro, so the enum, the
//! decoder, the mnemonic tables and the assembler's parser are all generated
//! from one list and cannot drift apart.
//!
//! This module generates:
//! - The [`Instruction`] enum with opcode mappings
//! - `TryFrom<u8>` for decoding opcode bytes
//! - [`Instruction::mnemonic`], [`Instruction::has_immediate`] and
//!   [`Instruction::from_mnemonic`]
//!
//! # Bytecode Format
//!
//! Every instruction is one opcode byte, optionally followed by one immediate
//! byte:
//! - `Addr`: index into the data segment
//! - `Target`: absolute index into the instruction segment

use crate::virtual_machine::errors::VMError;

/// Invokes a callback macro with the complete instruction definition list.
///
/// Stack effects are written Forth-style, `( before -- after )`, top of stack
/// on the right.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Stack manipulation
            // =========================
            /// NOOP ; ( -- )
            Noop = 0x00, "noop" => [],
            /// DROP ; ( a -- )
            Drop = 0x01, "drop" => [],
            /// LOAD addr ; ( -- data[addr] )
            Load = 0x02, "load" => [addr: Addr],
            /// DUP ; ( a -- a a )
            Dup = 0x03, "dup" => [],
            /// SWAP ; ( a b -- b a )
            Swap = 0x04, "swap" => [],
            /// OVER ; ( a b -- a b a )
            Over = 0x05, "over" => [],
            /// ROT ; ( a b c -- b c a )
            Rot = 0x06, "rot" => [],
            /// NIP ; ( a b -- b )
            Nip = 0x07, "nip" => [],
            /// TUCK ; ( a b -- b a b )
            Tuck = 0x08, "tuck" => [],
            // =========================
            // Integer arithmetic (wrapping u32)
            // =========================
            /// ADD ; ( a b -- a+b )
            Add = 0x09, "add" => [],
            /// INC ; ( a -- a+1 )
            Inc = 0x0A, "inc" => [],
            /// DEC ; ( a -- a-1 )
            Dec = 0x0B, "dec" => [],
            /// SUB ; ( a b -- a-b )
            Sub = 0x0C, "sub" => [],
            /// MUL ; ( a b -- a*b )
            Mul = 0x0D, "mul" => [],
            /// DIV ; ( a b -- a/b ), traps when b == 0
            Div = 0x0E, "div" => [],
            /// MOD ; ( a b -- a%b ), traps when b == 0
            Mod = 0x0F, "mod" => [],
            // =========================
            // Control flow
            // =========================
            /// JUMP target ; ( -- ) ip = target
            Jump = 0x10, "jump" => [target: Target],
            /// EQJP target ; ( a b -- ) if a == b then ip = target
            Eqjp = 0x11, "eqjp" => [target: Target],
            /// GTJP target ; ( a b -- ) if a > b then ip = target
            Gtjp = 0x12, "gtjp" => [target: Target],
            /// LTJP target ; ( a b -- ) if a < b then ip = target
            Ltjp = 0x13, "ltjp" => [target: Target],
            /// EQZJP target ; ( a -- ) if a == 0 then ip = target
            Eqzjp = 0x14, "eqzjp" => [target: Target],
            /// GTZJP target ; ( a -- ) if a > 0 then ip = target
            Gtzjp = 0x15, "gtzjp" => [target: Target],
            /// LTZJP target ; ( a -- ) if a < 0 then ip = target (never, values are unsigned)
            Ltzjp = 0x16, "ltzjp" => [target: Target],
            // =========================
            // Console
            // =========================
            /// IN ; ( -- n ) reads one unsigned integer from the console
            In = 0x17, "in" => [],
            /// OUT ; ( a -- ) writes a to the console
            Out = 0x18, "out" => [],
            // =========================
            // Termination
            // =========================
            /// HALT ; stops execution. Appended after every decoded program.
            Halt = 0xFF, "halt" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        // =========================
        // VM instruction enum
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Instruction {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::InvalidInstruction {
                        opcode: value,
                        ip: 0,
                    }),
                }
            }
        }

        impl Instruction {
            /// Every instruction, in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns true if one immediate byte follows the opcode.
            pub const fn has_immediate(&self) -> bool {
                match self {
                    $( Instruction::$name => $crate::define_instructions!(@count $( $field ),*) > 0, )*
                }
            }

            /// Encoded size in bytes: the opcode plus its immediate, if any.
            pub const fn size(&self) -> usize {
                if self.has_immediate() { 2 } else { 1 }
            }

            /// Looks up an instruction by its assembly mnemonic.
            pub fn from_mnemonic(name: &str) -> Option<Instruction> {
                match name {
                    $( $mnemonic => Some(Instruction::$name), )*
                    _ => None,
                }
            }
        }
    };

    (@count) => { 0usize };
    (@count $head:ident $(, $tail:ident)*) => { 1usize + $crate::define_instructions!(@count $( $tail ),*) };
}

for_each_instruction!(define_instructions);
