use std::io::Read;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExecError, Result};

/// A stdout-to-stdin pipeline: an ordered list of argv vectors.
///
/// The on-disk form is a JSON array of arrays of strings, e.g.
/// `[["cat", "/dev/null"], ["wc", "-l"]]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ChainSpec {
    stages: Vec<Vec<String>>,
}

impl ChainSpec {
    /// Build a pipeline from argv vectors, rejecting empty shapes.
    pub fn new(stages: Vec<Vec<String>>) -> Result<Self> {
        let spec = Self { stages };
        spec.validate()?;
        Ok(spec)
    }

    /// Parse and validate a pipeline document.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let spec: ChainSpec = serde_json::from_reader(reader)?;
        spec.validate()?;
        Ok(spec)
    }

    /// The argv vectors, in pipeline order.
    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(ExecError::EmptyPipeline);
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.is_empty() {
                return Err(ExecError::EmptyStage { index });
            }
        }
        Ok(())
    }
}

/// Run the pipeline, handing each stage's stdout to the next stage's
/// stdin at spawn time. The first stage reads the inherited stdin, the
/// last stage writes the inherited stdout, every stage inherits stderr.
///
/// All stages are reaped; the returned status is the first failing
/// stage's in pipeline order, or the last stage's on success. A stage
/// that cannot be spawned aborts the run after the already-started
/// stages are torn down.
pub fn run_chain(spec: &ChainSpec) -> Result<ExitStatus> {
    let mut children: Vec<(String, Child)> = Vec::with_capacity(spec.stages().len());
    let mut upstream_out: Option<ChildStdout> = None;
    let last = spec.stages().len() - 1;

    for (index, stage) in spec.stages().iter().enumerate() {
        let program = &stage[0];
        let mut command = Command::new(program);
        command.args(&stage[1..]);
        if let Some(out) = upstream_out.take() {
            command.stdin(Stdio::from(out));
        }
        if index != last {
            command.stdout(Stdio::piped());
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                teardown(&mut children);
                return Err(ExecError::Spawn {
                    program: program.clone(),
                    source,
                });
            }
        };
        debug!(program = program.as_str(), pid = child.id(), stage = index, "stage started");
        if index != last {
            upstream_out = child.stdout.take();
        }
        children.push((program.clone(), child));
    }

    let mut first_failure: Option<ExitStatus> = None;
    let mut last_status: Option<ExitStatus> = None;
    for (program, child) in &mut children {
        let status = child.wait().map_err(ExecError::Wait)?;
        if !status.success() && first_failure.is_none() {
            debug!(program = program.as_str(), code = status.code(), "stage failed");
            first_failure = Some(status);
        }
        last_status = Some(status);
    }

    // A validated spec has at least one stage, so a status always exists.
    first_failure.or(last_status).ok_or(ExecError::EmptyPipeline)
}

fn teardown(children: &mut [(String, Child)]) {
    for (program, child) in children {
        if let Err(err) = child.kill() {
            debug!(program = program.as_str(), "kill during teardown: {err}");
        }
        let _ = child.wait();
    }
}
