//! Reference runtime for imp object files.
//!
//! Loads one object file and runs it against the terminal until it halts.
//!
//! # Usage
//! ```text
//! imp <program.obj>
//! ```
//!
//! `in` prompts with `> ` and reads one unsigned integer per line; `out`
//! prints `< ` followed by the value. Diagnostics go to stderr and are
//! controlled by `IMP_LOG` (`debug`, `info`, `warn`, `error`, `off`).
//!
//! Exits 0 when the program halts, 1 on a usage, load or runtime error.

use imp::utils::log;
use imp::virtual_machine::console::StdConsole;
use imp::virtual_machine::program::ProgramImage;
use imp::virtual_machine::vm::VM;
use imp::{debug, error};
use std::env;
use std::process;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() == 2 && (args[1] == "--help" || args[1] == "-h") {
        print_usage(&args[0]);
        process::exit(0);
    }
    if args.len() != 2 {
        print_usage(args.first().map(String::as_str).unwrap_or("imp"));
        process::exit(1);
    }

    let path = &args[1];
    let image = match ProgramImage::load(path) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to load program: {}", e);
            process::exit(1);
        }
    };
    debug!(
        "loaded {} (version {}, {} data words, {} instruction bytes)",
        path,
        image.version(),
        image.data().len(),
        image.instruction_count()
    );

    let mut console = StdConsole::stdio();
    let mut vm = VM::new(&image);
    if let Err(e) = vm.run(&mut console) {
        error!("{}", e);
        process::exit(1);
    }

    debug!(
        "halted after {} steps, final stack depth {}",
        vm.steps(),
        vm.stack().len()
    );
}

const USAGE: &str = "\
imp stack machine

USAGE:
    {program} <program.obj>

ARGS:
    <program.obj>    Object file to execute

OPTIONS:
    -h, --help       Print this help message

ENVIRONMENT:
    IMP_LOG              Log level: debug, info, warn, error, off (default info)
    IMP_LOG_TIMESTAMP    Set to 0 to omit timestamps from log lines
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
