//! spv - command-line front end for the sprite variant engine

use std::process::ExitCode;

use sprite_variants::cli;

fn main() -> ExitCode {
    cli::run()
}
