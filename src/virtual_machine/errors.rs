use imp_derive::Error;

/// Errors raised while decoding, assembling or executing a program.
///
/// Runtime variants carry the mnemonic and instruction pointer of the
/// instruction that failed. All of them end the run.
#[derive(Debug, Error)]
pub enum VMError {
    // =========================
    // Object decoding
    // =========================
    /// Object file ended before the header, data or instruction segment was complete.
    #[error("truncated object file: {section} needs {expected} bytes, {available} available")]
    TruncatedInput {
        section: &'static str,
        expected: usize,
        available: usize,
    },

    // =========================
    // Execution
    // =========================
    /// Pop or peek reached below the bottom of the operand stack.
    #[error("{instruction} at {ip}: stack underflow (depth {depth}, size {size})")]
    StackUnderflow {
        instruction: &'static str,
        ip: usize,
        depth: usize,
        size: usize,
    },
    /// `div` or `mod` with a zero divisor.
    #[error("{instruction} at {ip}: division by zero")]
    DivideByZero { instruction: &'static str, ip: usize },
    /// Jump or branch target past the terminal halt byte.
    #[error("{instruction} at {ip}: jump target {target} outside [0, {limit}]")]
    InvalidJumpTarget {
        instruction: &'static str,
        ip: usize,
        target: usize,
        limit: usize,
    },
    /// `load` address past the end of the data segment.
    #[error("load at {ip}: data address {address} out of bounds ({available} words)")]
    InvalidDataAddress {
        ip: usize,
        address: u8,
        available: usize,
    },
    /// Opcode byte that is not part of the instruction set.
    #[error("invalid instruction 0x{opcode:02X} at {ip}")]
    InvalidInstruction { opcode: u8, ip: usize },
    /// Immediate-operand opcode placed on the last declared instruction byte.
    #[error("{instruction} at {ip}: missing immediate operand")]
    MissingOperand { instruction: &'static str, ip: usize },
    /// Console token that is not an unsigned 32-bit integer.
    #[error("in at {ip}: expected an unsigned 32-bit integer, got '{input}'")]
    MalformedInput { ip: usize, input: String },
    /// Console input closed while `in` was waiting.
    #[error("in at {ip}: end of input")]
    EndOfInput { ip: usize },
    /// Console or file I/O failure.
    #[error("io error: {reason}")]
    Io { reason: String },

    // =========================
    // Assembly
    // =========================
    /// Assembly error with line number context.
    #[error("line {line}: {source}")]
    AssemblyError { line: usize, source: Box<VMError> },
    /// Unrecognized instruction mnemonic.
    #[error("invalid instruction name: {name}")]
    InvalidInstructionName { name: String },
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to undefined label.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Literal that does not fit its slot.
    #[error("value {value} out of range (max {max})")]
    ValueOutOfRange { value: String, max: u64 },
    /// `DAT` or `INS` marker missing.
    #[error("missing {section} section")]
    MissingSection { section: &'static str },
    /// Segment longer than its one-byte count can describe.
    #[error("{section} segment has {len} entries, at most 255 allowed")]
    SegmentTooLarge { section: &'static str, len: usize },
}

impl From<std::io::Error> for VMError {
    fn from(err: std::io::Error) -> Self {
        VMError::Io {
            reason: err.to_string(),
        }
    }
}
