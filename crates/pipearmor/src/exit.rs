use std::fmt;
use std::io;
use std::process::ExitStatus;

use pipearmor_exec::ExecError;
use pipearmor_frame::FrameError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn exec_error(context: &str, err: ExecError) -> CliError {
    let code = match &err {
        ExecError::Spawn { .. }
        | ExecError::Pipe(_)
        | ExecError::Wait(_)
        | ExecError::TaskPanic(_) => INTERNAL,
        ExecError::Frame(FrameError::InvalidEscape { .. }) => DATA_INVALID,
        ExecError::EmptyPipeline | ExecError::EmptyStage { .. } | ExecError::ChainParse(_) => USAGE,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Map a child's exit status to this process's exit code: the child's
/// own code when it has one, 128 + signal number when it was killed by
/// a signal.
pub fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failures_are_internal() {
        let err = exec_error(
            "run failed",
            ExecError::Spawn {
                program: "nope".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, INTERNAL);
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn protocol_violations_are_data_invalid() {
        let err = exec_error(
            "wrapped run failed",
            ExecError::Frame(FrameError::InvalidEscape { byte: b'x' }),
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn truncation_is_a_plain_failure() {
        let err = exec_error("wrapped run failed", ExecError::UpstreamTruncated);
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn bad_pipeline_documents_are_usage_errors() {
        let err = exec_error("pipeline failed", ExecError::EmptyPipeline);
        assert_eq!(err.code, USAGE);
    }

    #[cfg(unix)]
    #[test]
    fn signal_deaths_map_above_128() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(9); // killed by SIGKILL
        assert_eq!(status_code(status), 128 + 9);
    }

    #[cfg(unix)]
    #[test]
    fn plain_codes_pass_through() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(7 << 8);
        assert_eq!(status_code(status), 7);
    }
}
