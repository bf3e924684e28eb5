//! Assembly to object file compiler CLI.
//!
//! Reads imp assembly source and writes a loadable object file.
//!
//! # Usage
//! ```text
//! assembler <input.imp> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.imp`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.obj`)
//! - `-l, --listing`: Print the listing of the compiled object
//!
//! # Examples
//! ```text
//! assembler gcd.imp
//! assembler gcd.imp -o out/gcd.obj
//! assembler gcd.imp -l
//! ```

use imp::utils::log;
use imp::virtual_machine::assembler::{assemble_source, render_diagnostic};
use imp::virtual_machine::listing;
use imp::{error, info};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut show_listing = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--listing" | "-l" => {
                show_listing = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let source = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.obj", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let image = match assemble_source(&source) {
        Ok(image) => image,
        Err(e) => {
            error!(
                "Assembly failed\n{}",
                render_diagnostic(input_path, &source, &e)
            );
            process::exit(1);
        }
    };

    let bytes = image.to_bytes();
    if let Err(e) = fs::write(&output_path, &bytes) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} bytes)",
        input_path,
        output_path,
        bytes.len()
    );

    if show_listing {
        print!("{}", listing::render(&image));
    }
}

const USAGE: &str = "\
imp assembler

USAGE:
    {program} <input.imp> [OPTIONS]

ARGS:
    <input.imp>    Assembly source file to compile

OPTIONS:
    -o, --output <file>    Output file path (defaults to <input>.obj)
    -l, --listing          Print the listing of the compiled object
    -h, --help             Print this help message

EXAMPLES:
    # Compile to default output name
    {program} gcd.imp

    # Compile with explicit output
    {program} gcd.imp -o out/gcd.obj
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
