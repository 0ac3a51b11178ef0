use tracing::warn;

use pipearmor_exec::{run_wrapped, WrapOptions};

use crate::cmd::WrapArgs;
use crate::exit::{exec_error, status_code, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: WrapArgs) -> CliResult<i32> {
    let Some((program, rest)) = args.command.split_first() else {
        return Err(CliError::new(USAGE, "missing command"));
    };
    let options = WrapOptions {
        decode_stdin: args.input,
        encode_stdout: args.output,
    };

    let status = run_wrapped(program, rest, options)
        .map_err(|err| exec_error(&format!("wrapped run of {program} failed"), err))?;
    if status.success() {
        return Ok(SUCCESS);
    }
    warn!(program = program.as_str(), code = status.code(), "child exited with failure");
    Ok(status_code(status))
}
