use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;

pub mod chain;
pub mod wrap;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command with framed stdin and/or stdout.
    Wrap(WrapArgs),
    /// Run a stdout-to-stdin pipeline described by a JSON document.
    Chain(ChainArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Wrap(args) => wrap::run(args),
        Command::Chain(args) => chain::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WrapArgs {
    /// Decode framed bytes arriving on stdin into the command's stdin.
    #[arg(short = 'i', long = "input")]
    pub input: bool,

    /// Encode the command's stdout as framed bytes on stdout.
    #[arg(short = 'o', long = "output")]
    pub output: bool,

    /// Command to run, followed by its arguments (passed through verbatim).
    #[arg(required = true, trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Pipeline document (a JSON array of argv arrays); `-` or omitted
    /// reads it from stdin.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}
