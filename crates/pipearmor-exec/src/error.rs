use std::io;

use pipearmor_frame::FrameError;

/// Errors from spawning and supervising child processes.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The child program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    /// A captured child stream handle was missing after spawn.
    #[error("child {0} was not captured")]
    Pipe(&'static str),

    /// Failed reading from the upstream byte source.
    #[error("reading upstream input: {0}")]
    UpstreamRead(io::Error),

    /// Failed reading the child's output pipe.
    #[error("reading child output: {0}")]
    ChildRead(io::Error),

    /// A framing failure on either side task: a protocol violation in
    /// the decoded input, or an I/O error on a frame sink.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Upstream input ended before sending the end-of-stream marker.
    #[error("upstream input ended before the end-of-stream marker")]
    UpstreamTruncated,

    /// Failed waiting for a child to exit.
    #[error("waiting for child: {0}")]
    Wait(io::Error),

    /// A side task panicked.
    #[error("{0} task panicked")]
    TaskPanic(&'static str),

    /// The pipeline document has no stages.
    #[error("pipeline document has no stages")]
    EmptyPipeline,

    /// A pipeline stage has no argv entries.
    #[error("pipeline stage {index} is empty")]
    EmptyStage { index: usize },

    /// The pipeline document is not valid JSON.
    #[error("parsing pipeline document: {0}")]
    ChainParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;
