//! Child process orchestration for framed standard streams.
//!
//! Two runners live here:
//!
//! - [`run_wrapped`] spawns one child, rebinds its standard streams to
//!   internally created pipes, and runs the framing protocol from
//!   [`pipearmor_frame`] concurrently with the child: a decoding task
//!   feeds recovered upstream payload into the child's stdin, an
//!   encoding task wraps the child's stdout for downstream. Truncated
//!   upstream input cancels the child instead of leaving it waiting on
//!   a stream that will never complete.
//! - [`run_chain`] runs a stdout-to-stdin pipeline of commands with no
//!   framing involved, propagating the first failing stage's status.
//!
//! Both runners return the decisive [`std::process::ExitStatus`] and
//! leave process-exit policy to the caller.

mod cancel;
pub mod chain;
pub mod error;
pub mod wrap;

pub use chain::{run_chain, ChainSpec};
pub use error::{ExecError, Result};
pub use wrap::{run_wrapped, run_wrapped_io, WrapOptions};
