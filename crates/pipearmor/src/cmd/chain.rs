use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use tracing::warn;

use pipearmor_exec::{run_chain, ChainSpec};

use crate::cmd::ChainArgs;
use crate::exit::{exec_error, io_error, status_code, CliResult, SUCCESS};

pub fn run(args: ChainArgs) -> CliResult<i32> {
    let spec = load_spec(args.config.as_deref())?;
    let status = run_chain(&spec).map_err(|err| exec_error("pipeline failed", err))?;
    if status.success() {
        return Ok(SUCCESS);
    }
    warn!(code = status.code(), "pipeline stage exited with failure");
    Ok(status_code(status))
}

fn load_spec(config: Option<&Path>) -> CliResult<ChainSpec> {
    let parse_error = |err| exec_error("invalid pipeline document", err);
    match config {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            ChainSpec::from_reader(BufReader::new(file)).map_err(parse_error)
        }
        _ => ChainSpec::from_reader(io::stdin().lock()).map_err(parse_error),
    }
}
