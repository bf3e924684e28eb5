//! Console exchange for the `in` and `out` instructions.
//!
//! The [`Console`] trait is the only way the VM talks to the outside world.
//! [`StdConsole`] implements the interactive protocol over any buffered
//! reader and writer: `in` writes [`INPUT_PROMPT`] and blocks for one line,
//! `out` writes [`OUTPUT_MARKER`], the value and a newline.

use std::io::{self, BufRead, Write};

/// Written before blocking on a line of input.
pub const INPUT_PROMPT: &str = "> ";

/// Written before every output value.
pub const OUTPUT_MARKER: &str = "< ";

/// Line-oriented console used by the VM.
pub trait Console {
    /// Prompts for and reads one line of input, without its line terminator.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Writes one output value.
    fn write_value(&mut self, value: u32) -> io::Result<()>;
}

/// Interactive console over a reader/writer pair.
pub struct StdConsole<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the console, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl StdConsole<io::StdinLock<'static>, io::Stdout> {
    /// Console bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for StdConsole<R, W> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.writer.write_all(INPUT_PROMPT.as_bytes())?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn write_value(&mut self, value: u32) -> io::Result<()> {
        writeln!(self.writer, "{OUTPUT_MARKER}{value}")?;
        self.writer.flush()
    }
}
