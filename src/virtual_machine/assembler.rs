//! Assembly language parser and object builder.
//!
//! # Syntax
//!
//! ```text
//! DAT 2312 320            ; data words
//! INS
//!       load 0 load 1
//! loop: eqzjp @done       ; label definition and reference
//!       swap over mod
//!       jump @loop
//! done: drop out
//! ```
//!
//! - `;` starts a comment that runs to the end of the line
//! - Tokens are separated by whitespace; layout is free
//! - `DAT` opens the data section: decimal `u32` words
//! - `INS` opens the instruction section, where every token is one byte:
//!   a lowercase mnemonic, a decimal byte literal, or a label reference `@name`
//! - `name:` marks the current instruction offset and emits nothing
//!
//! Labels may be used before they are defined; they are resolved in a second
//! pass once every offset is known.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::{MAX_SEGMENT_LEN, ProgramImage};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = ';';
const LABEL_SUFFIX: char = ':';
const LABEL_REF_PREFIX: char = '@';
const SECTION_DATA: &str = "DAT";
const SECTION_CODE: &str = "INS";

/// Which part of the source we are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before the `DAT` marker.
    None,
    Data,
    Code,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    /// 1-based source line.
    line: usize,
}

/// Splits source into tokens, dropping comments.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    source
        .lines()
        .enumerate()
        .flat_map(|(idx, raw)| {
            let code = raw.split(COMMENT_CHAR).next().unwrap_or("");
            code.split_whitespace()
                .map(move |text| Token { text, line: idx + 1 })
        })
        .collect()
}

/// One instruction-section byte before label resolution.
#[derive(Debug, Clone)]
enum Item {
    Byte(u8),
    LabelRef(String),
}

/// Label table and emitted items for the instruction section.
#[derive(Default)]
struct AsmContext {
    labels: HashMap<String, usize>,
    items: Vec<(usize, Item)>,
}

impl AsmContext {
    /// Registers a label at the current offset.
    fn define_label(&mut self, name: &str) -> Result<(), VMError> {
        if name.is_empty() || self.labels.contains_key(name) {
            return Err(VMError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), self.items.len());
        Ok(())
    }

    fn resolve_label(&self, name: &str) -> Result<u8, VMError> {
        let offset = self
            .labels
            .get(name)
            .copied()
            .ok_or(VMError::UndefinedLabel {
                label: name.to_string(),
            })?;
        u8::try_from(offset).map_err(|_| VMError::ValueOutOfRange {
            value: format!("@{name} = {offset}"),
            max: u8::MAX as u64,
        })
    }
}

fn at_line(line: usize) -> impl Fn(VMError) -> VMError {
    move |err| VMError::AssemblyError {
        line,
        source: Box::new(err),
    }
}

fn parse_word(text: &str) -> Result<u32, VMError> {
    text.parse::<u32>().map_err(|_| VMError::ValueOutOfRange {
        value: text.to_string(),
        max: u32::MAX as u64,
    })
}

/// Parses one instruction-section token that is not a label definition.
fn parse_code_token(text: &str) -> Result<Item, VMError> {
    if let Some(label) = text.strip_prefix(LABEL_REF_PREFIX) {
        return Ok(Item::LabelRef(label.to_string()));
    }
    if let Some(instr) = Instruction::from_mnemonic(text) {
        return Ok(Item::Byte(instr as u8));
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<u8>()
            .map(Item::Byte)
            .map_err(|_| VMError::ValueOutOfRange {
                value: text.to_string(),
                max: u8::MAX as u64,
            });
    }
    Err(VMError::InvalidInstructionName {
        name: text.to_string(),
    })
}

/// Assemble a full source string into a program image.
///
/// Uses two passes:
/// 1. Split sections, parse data words, record label offsets
/// 2. Resolve label references into instruction bytes
pub fn assemble_source(source: impl AsRef<str>) -> Result<ProgramImage, VMError> {
    let tokens = tokenize(source.as_ref());

    let mut section = Section::None;
    let mut data = Vec::new();
    let mut ctx = AsmContext::default();

    for tok in tokens {
        match (section, tok.text) {
            (Section::None, SECTION_DATA) => section = Section::Data,
            (Section::None, _) => {
                return Err(at_line(tok.line)(VMError::MissingSection {
                    section: SECTION_DATA,
                }));
            }
            (Section::Data, SECTION_CODE) => section = Section::Code,
            (Section::Data, text) => data.push(parse_word(text).map_err(at_line(tok.line))?),
            (Section::Code, text) => {
                if let Some(label) = text.strip_suffix(LABEL_SUFFIX) {
                    ctx.define_label(label).map_err(at_line(tok.line))?;
                } else {
                    let item = parse_code_token(text).map_err(at_line(tok.line))?;
                    ctx.items.push((tok.line, item));
                }
            }
        }
    }

    match section {
        Section::None => {
            return Err(VMError::MissingSection {
                section: SECTION_DATA,
            });
        }
        Section::Data => {
            return Err(VMError::MissingSection {
                section: SECTION_CODE,
            });
        }
        Section::Code => {}
    }

    if data.len() > MAX_SEGMENT_LEN {
        return Err(VMError::SegmentTooLarge {
            section: "data",
            len: data.len(),
        });
    }
    if ctx.items.len() > MAX_SEGMENT_LEN {
        return Err(VMError::SegmentTooLarge {
            section: "instruction",
            len: ctx.items.len(),
        });
    }

    let code = ctx
        .items
        .iter()
        .map(|(line, item)| match item {
            Item::Byte(b) => Ok(*b),
            Item::LabelRef(name) => ctx.resolve_label(name).map_err(at_line(*line)),
        })
        .collect::<Result<Vec<u8>, VMError>>()?;

    ProgramImage::new(data, code)
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<ProgramImage, VMError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| VMError::Io {
        reason: format!("{}: {}", path.display(), e),
    })?;
    assemble_source(source)
}

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// Errors without a line number render as a single `error:` line.
pub fn render_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let VMError::AssemblyError { line, source: cause } = err else {
        return format!("error: {err}");
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {cause}");
    let _ = writeln!(diag, " --> {file}:{line}");
    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, raw_line.trim_end_matches('\r'));
    }
    diag
}
