//! Prints the listing of an imp object file.
//!
//! # Usage
//! ```text
//! listing <program.obj>
//! ```

use imp::error;
use imp::utils::log;
use imp::virtual_machine::listing;
use imp::virtual_machine::program::ProgramImage;
use std::env;
use std::process;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("USAGE:\n    {} <program.obj>", program_name(&args));
        process::exit(if args.len() == 2 { 0 } else { 1 });
    }

    match ProgramImage::load(&args[1]) {
        Ok(image) => print!("{}", listing::render(&image)),
        Err(e) => {
            error!("Failed to load program: {}", e);
            process::exit(1);
        }
    }
}

/// Name to show in the usage line; argv may be empty.
fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("listing")
}
