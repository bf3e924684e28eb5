//! Core virtual machine implementation.
//!
//! The VM executes a [`ProgramImage`] against an [`OperandStack`]. Each step
//! fetches the opcode at the instruction pointer, reads its immediate byte if
//! it has one, and applies the instruction. Execution ends when the halt byte
//! is reached, either the one appended after the declared instructions or an
//! explicit `halt`.
//!
//! All arithmetic wraps modulo 2^32. Every memory access is bounds-checked and
//! reported as a [`VMError`] carrying the failing instruction and its offset.

use crate::debug;
use crate::virtual_machine::console::Console;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::ProgramImage;
use crate::virtual_machine::stack::{OperandStack, StackUnderflow};

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        console = $console:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident $args:tt ),* $(,)? }
    ) => {{
        match $instr {
            $(
                Instruction::$variant => exec_vm!(@call $vm, $console, $handler, $args),
            )*
        }
    }};

    // Handler that talks to the console
    (@call $vm:ident, $console:ident, $handler:ident, (console)) => {{
        $vm.$handler($console)
    }};

    // Handler with immediate operands
    (@call $vm:ident, $console:ident, $handler:ident,
        ( $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@read $vm, $kind)?; )*
        $vm.$handler($( $field ),*)
    }};

    // Data segment address
    (@read $vm:ident, Addr) => {{
        $vm.read_operand()
    }};

    // Absolute instruction index
    (@read $vm:ident, Target) => {{
        $vm.read_operand()
    }};
}

/// Bytecode virtual machine.
///
/// Borrows the data and instruction segments of one [`ProgramImage`] and owns
/// the operand stack for a single run.
pub struct VM<'a> {
    /// Data segment, read by `load`.
    data: &'a [u32],
    /// Instruction segment, including the trailing halt byte.
    instructions: &'a [u8],
    /// Number of declared instruction bytes; `instructions[limit]` is the halt byte.
    limit: usize,
    /// Instruction pointer (next byte to read).
    ip: usize,
    /// Offset of the instruction currently executing.
    instr_offset: usize,
    /// Instruction currently executing.
    instr: Instruction,
    stack: OperandStack,
    /// Instructions executed so far, halt excluded.
    steps: u64,
}

impl<'a> VM<'a> {
    /// Creates a VM positioned at the first instruction with an empty stack.
    pub fn new(image: &'a ProgramImage) -> Self {
        Self {
            data: image.data(),
            instructions: image.instructions(),
            limit: image.instruction_count(),
            ip: 0,
            instr_offset: 0,
            instr: Instruction::Noop,
            stack: OperandStack::new(),
            steps: 0,
        }
    }

    /// Executes until a halt byte is reached.
    ///
    /// Any runtime error ends the run immediately; the stack is left as it
    /// was when the failing instruction gave up.
    pub fn run<C: Console>(&mut self, console: &mut C) -> Result<(), VMError> {
        loop {
            let instr = self.fetch()?;
            if instr == Instruction::Halt {
                debug!(
                    "halt at {} after {} steps, stack depth {}",
                    self.instr_offset,
                    self.steps,
                    self.stack.len()
                );
                return Ok(());
            }
            debug!(
                "{:>3}  {:<5} {:>3}  depth {}",
                self.instr_offset,
                instr.mnemonic(),
                self.instructions
                    .get(self.ip)
                    .filter(|_| instr.has_immediate())
                    .map(u8::to_string)
                    .unwrap_or_default(),
                self.stack.len()
            );
            self.exec(instr, console)?;
            self.steps += 1;
        }
    }

    /// Operand stack as left by the last run.
    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    /// Current instruction pointer.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Number of instructions executed, not counting the final halt.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Decodes the opcode at the instruction pointer and advances past it.
    fn fetch(&mut self) -> Result<Instruction, VMError> {
        let offset = self.ip;
        let opcode = self
            .instructions
            .get(offset)
            .copied()
            .ok_or(VMError::InvalidJumpTarget {
                instruction: self.instr.mnemonic(),
                ip: self.instr_offset,
                target: offset,
                limit: self.limit,
            })?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VMError::InvalidInstruction { opcode, ip: offset })?;
        self.instr_offset = offset;
        self.instr = instr;
        self.ip = offset + 1;
        Ok(instr)
    }

    /// Reads the immediate byte of the current instruction.
    ///
    /// The halt byte is never an operand: an immediate-operand opcode on the
    /// last declared byte is [`VMError::MissingOperand`].
    fn read_operand(&mut self) -> Result<u8, VMError> {
        if self.ip >= self.limit {
            return Err(VMError::MissingOperand {
                instruction: self.instr.mnemonic(),
                ip: self.instr_offset,
            });
        }
        let byte = self.instructions[self.ip];
        self.ip += 1;
        Ok(byte)
    }

    /// Executes a single instruction.
    fn exec<C: Console>(&mut self, instruction: Instruction, console: &mut C) -> Result<(), VMError> {
        exec_vm! {
            vm = self,
            console = console,
            instr = instruction,
            {
                // Stack manipulation
                Noop => op_noop(),
                Drop => op_drop(),
                Load => op_load(addr: Addr),
                Dup => op_dup(),
                Swap => op_swap(),
                Over => op_over(),
                Rot => op_rot(),
                Nip => op_nip(),
                Tuck => op_tuck(),
                // Integer arithmetic
                Add => op_add(),
                Inc => op_inc(),
                Dec => op_dec(),
                Sub => op_sub(),
                Mul => op_mul(),
                Div => op_div(),
                Mod => op_mod(),
                // Control flow
                Jump => op_jump(target: Target),
                Eqjp => op_eqjp(target: Target),
                Gtjp => op_gtjp(target: Target),
                Ltjp => op_ltjp(target: Target),
                Eqzjp => op_eqzjp(target: Target),
                Gtzjp => op_gtzjp(target: Target),
                Ltzjp => op_ltzjp(target: Target),
                // Console
                In => op_in(console),
                Out => op_out(console),
                // Handled by `run` before dispatch
                Halt => op_noop(),
            }
        }
    }

    fn underflow(&self, err: StackUnderflow) -> VMError {
        VMError::StackUnderflow {
            instruction: self.instr.mnemonic(),
            ip: self.instr_offset,
            depth: err.depth,
            size: err.size,
        }
    }

    fn pop(&mut self) -> Result<u32, VMError> {
        self.stack.pop().map_err(|e| self.underflow(e))
    }

    fn peek(&self, depth: usize) -> Result<u32, VMError> {
        self.stack.peek(depth).map_err(|e| self.underflow(e))
    }

    fn push(&mut self, word: u32) {
        self.stack.push(word);
    }

    /// Pops `b` then `a` and pushes `f(a, b)`.
    fn binary_op(&mut self, f: impl FnOnce(u32, u32) -> u32) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(f(a, b));
        Ok(())
    }

    /// Pops `b` then `a` and pushes `f(a, b)`, trapping when `b` is zero.
    fn checked_div_op(&mut self, f: impl FnOnce(u32, u32) -> u32) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        if b == 0 {
            return Err(VMError::DivideByZero {
                instruction: self.instr.mnemonic(),
                ip: self.instr_offset,
            });
        }
        self.push(f(a, b));
        Ok(())
    }

    /// Moves the instruction pointer to `target` when `taken`.
    ///
    /// `target` may equal the declared instruction count, which lands on the
    /// halt byte; anything past it is [`VMError::InvalidJumpTarget`].
    fn branch(&mut self, taken: bool, target: u8) -> Result<(), VMError> {
        if !taken {
            return Ok(());
        }
        let target = target as usize;
        if target > self.limit {
            return Err(VMError::InvalidJumpTarget {
                instruction: self.instr.mnemonic(),
                ip: self.instr_offset,
                target,
                limit: self.limit,
            });
        }
        self.ip = target;
        Ok(())
    }

    fn op_noop(&mut self) -> Result<(), VMError> {
        Ok(())
    }

    fn op_drop(&mut self) -> Result<(), VMError> {
        self.pop().map(|_| ())
    }

    fn op_load(&mut self, addr: u8) -> Result<(), VMError> {
        let word = self
            .data
            .get(addr as usize)
            .copied()
            .ok_or(VMError::InvalidDataAddress {
                ip: self.instr_offset,
                address: addr,
                available: self.data.len(),
            })?;
        self.push(word);
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), VMError> {
        let top = self.peek(0)?;
        self.push(top);
        Ok(())
    }

    fn op_swap(&mut self) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(b);
        self.push(a);
        Ok(())
    }

    fn op_over(&mut self) -> Result<(), VMError> {
        let second = self.peek(1)?;
        self.push(second);
        Ok(())
    }

    fn op_rot(&mut self) -> Result<(), VMError> {
        let c = self.pop()?;
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(b);
        self.push(c);
        self.push(a);
        Ok(())
    }

    fn op_nip(&mut self) -> Result<(), VMError> {
        let b = self.pop()?;
        self.pop()?;
        self.push(b);
        Ok(())
    }

    fn op_tuck(&mut self) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(b);
        self.push(a);
        self.push(b);
        Ok(())
    }

    fn op_add(&mut self) -> Result<(), VMError> {
        self.binary_op(u32::wrapping_add)
    }

    fn op_inc(&mut self) -> Result<(), VMError> {
        let a = self.pop()?;
        self.push(a.wrapping_add(1));
        Ok(())
    }

    fn op_dec(&mut self) -> Result<(), VMError> {
        let a = self.pop()?;
        self.push(a.wrapping_sub(1));
        Ok(())
    }

    fn op_sub(&mut self) -> Result<(), VMError> {
        self.binary_op(u32::wrapping_sub)
    }

    fn op_mul(&mut self) -> Result<(), VMError> {
        self.binary_op(u32::wrapping_mul)
    }

    fn op_div(&mut self) -> Result<(), VMError> {
        self.checked_div_op(|a, b| a / b)
    }

    fn op_mod(&mut self) -> Result<(), VMError> {
        self.checked_div_op(|a, b| a % b)
    }

    fn op_jump(&mut self, target: u8) -> Result<(), VMError> {
        self.branch(true, target)
    }

    fn op_eqjp(&mut self, target: u8) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.branch(a == b, target)
    }

    fn op_gtjp(&mut self, target: u8) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.branch(a > b, target)
    }

    fn op_ltjp(&mut self, target: u8) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.branch(a < b, target)
    }

    fn op_eqzjp(&mut self, target: u8) -> Result<(), VMError> {
        let a = self.pop()?;
        self.branch(a == 0, target)
    }

    fn op_gtzjp(&mut self, target: u8) -> Result<(), VMError> {
        let a = self.pop()?;
        self.branch(a > 0, target)
    }

    /// Compares as unsigned, like every other branch, so it is never taken.
    fn op_ltzjp(&mut self, target: u8) -> Result<(), VMError> {
        self.pop()?;
        self.branch(false, target)
    }

    fn op_in<C: Console>(&mut self, console: &mut C) -> Result<(), VMError> {
        let line = console
            .read_line()?
            .ok_or(VMError::EndOfInput {
                ip: self.instr_offset,
            })?;
        let value = line
            .trim()
            .parse::<u32>()
            .map_err(|_| VMError::MalformedInput {
                ip: self.instr_offset,
                input: line.clone(),
            })?;
        self.push(value);
        Ok(())
    }

    fn op_out<C: Console>(&mut self, console: &mut C) -> Result<(), VMError> {
        let value = self.pop()?;
        console.write_value(value)?;
        Ok(())
    }
}
