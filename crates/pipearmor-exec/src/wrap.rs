use std::io::{ErrorKind, Read, Write};
use std::process::{ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, error, warn};

use pipearmor_frame::{BlockDecoder, BlockWriter, FrameError};

use crate::cancel;
use crate::error::{ExecError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Which of the child's standard streams get the framing treatment.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapOptions {
    /// Decode framed upstream bytes into the child's stdin.
    pub decode_stdin: bool,
    /// Encode the child's stdout into framed downstream bytes.
    pub encode_stdout: bool,
}

/// Run `program` with its standard streams wrapped per `options`, bound
/// to the real stdin and stdout of this process.
///
/// Returns the child's exit status for the caller to map; side-task
/// failures (protocol violations, truncated upstream input, transport
/// errors) take precedence over the status.
pub fn run_wrapped(program: &str, args: &[String], options: WrapOptions) -> Result<ExitStatus> {
    run_wrapped_io(program, args, options, std::io::stdin(), std::io::stdout())
}

/// Run `program` against explicit upstream and downstream endpoints.
///
/// `upstream` feeds the decoder when stdin wrapping is on; `downstream`
/// receives encoded blocks when stdout wrapping is on. Unwrapped
/// streams stay bound to the process defaults, as does stderr.
pub fn run_wrapped_io<R, W>(
    program: &str,
    args: &[String],
    options: WrapOptions,
    upstream: R,
    downstream: W,
) -> Result<ExitStatus>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let mut command = Command::new(program);
    command.args(args);
    if options.decode_stdin {
        command.stdin(Stdio::piped());
    }
    if options.encode_stdout {
        command.stdout(Stdio::piped());
    }

    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let pid = child.id();
    debug!(pid, program, "child started");

    // Dropped only after the child has been reaped. The input task uses
    // it both to detect child completion and to hold its pipe write end
    // open until a cancellation has been acknowledged.
    let (done_tx, done_rx) = mpsc::channel::<()>();
    // Receives one message when the run succeeded; the output task only
    // emits the end-of-stream trailer after that message. A dropped
    // sender means a failed run and no trailer.
    let (trailer_tx, trailer_rx) = mpsc::channel::<()>();

    let input_task = if options.decode_stdin {
        let child_stdin = child.stdin.take().ok_or(ExecError::Pipe("stdin"))?;
        Some(thread::spawn(move || {
            decode_into_child(upstream, child_stdin, pid, done_rx)
        }))
    } else {
        None
    };

    let output_task = if options.encode_stdout {
        let child_stdout = child.stdout.take().ok_or(ExecError::Pipe("stdout"))?;
        Some(thread::spawn(move || {
            encode_from_child(child_stdout, downstream, pid, trailer_rx)
        }))
    } else {
        None
    };

    let status = child.wait().map_err(ExecError::Wait)?;
    debug!(pid, code = status.code(), "child exited");

    // Shutdown order: acknowledge the reaped child first (this releases
    // an input task waiting out a cancellation), then settle the
    // trailer, then collect both tasks so no buffered output is lost.
    drop(done_tx);
    if status.success() {
        let _ = trailer_tx.send(());
    }
    drop(trailer_tx);

    let output_result = join_task(output_task, "output")?;
    let input_result = join_task(input_task, "input")?;

    input_result?;
    output_result?;
    Ok(status)
}

fn join_task(
    task: Option<thread::JoinHandle<Result<()>>>,
    name: &'static str,
) -> Result<Result<()>> {
    match task {
        Some(handle) => handle.join().map_err(|_| ExecError::TaskPanic(name)),
        None => Ok(Ok(())),
    }
}

/// True once the supervising thread has reaped the child and dropped
/// its end of the completion channel.
fn child_done(done_rx: &Receiver<()>) -> bool {
    matches!(done_rx.try_recv(), Err(TryRecvError::Disconnected))
}

/// Cancel the child over its pid, then hold the pipe write end open
/// until the supervising thread has reaped it.
fn cancel_and_fail(err: ExecError, pid: u32, done_rx: &Receiver<()>) -> Result<()> {
    if !child_done(done_rx) {
        cancel::terminate(pid);
        let _ = done_rx.recv();
    }
    Err(err)
}

/// Input side: read framed bytes from upstream, strip the framing, and
/// forward recovered payload into the child's stdin pipe.
fn decode_into_child<R: Read>(
    mut upstream: R,
    child_stdin: ChildStdin,
    pid: u32,
    done_rx: Receiver<()>,
) -> Result<()> {
    let mut decoder = BlockDecoder::new(child_stdin);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let read = match upstream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                if child_done(&done_rx) {
                    warn!("upstream input failed after the child exited: {err}");
                    return Ok(());
                }
                return cancel_and_fail(ExecError::UpstreamRead(err), pid, &done_rx);
            }
        };

        match decoder.feed(&chunk[..read]) {
            Ok(_) => {}
            Err(FrameError::Io(err)) if err.kind() == ErrorKind::BrokenPipe => {
                // The read end of the stdin pipe is gone, so the child
                // has stopped taking input. Wait for it to be reaped and
                // treat the run as a normal completion.
                let _ = done_rx.recv();
                warn!(pid, "child exited before consuming all of its input");
                return Ok(());
            }
            Err(err) => return cancel_and_fail(err.into(), pid, &done_rx),
        }

        if decoder.finished() {
            debug!(pid, "end-of-stream marker received");
            break;
        }
    }

    if decoder.finished() {
        // Dropping the decoder closes the pipe write end, which is the
        // child's end-of-input signal.
        return Ok(());
    }

    error!(pid, "upstream input ended before the end-of-stream marker; cancelling child");
    cancel_and_fail(ExecError::UpstreamTruncated, pid, &done_rx)
}

/// Output side: copy the child's stdout pipe into the downstream sink
/// as framed blocks, then emit the trailer if the run succeeded.
fn encode_from_child<W: Write>(
    mut child_stdout: ChildStdout,
    downstream: W,
    pid: u32,
    trailer_rx: Receiver<()>,
) -> Result<()> {
    let mut writer = BlockWriter::new(downstream);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        // A zero-length read means the pipe write end is closed, which
        // cannot happen before the child has exited and been drained.
        let read = match child_stdout.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                cancel::terminate(pid);
                return Err(ExecError::ChildRead(err));
            }
        };
        if let Err(err) = writer.write_block(&chunk[..read]) {
            // The child must not be left blocking on a pipe nobody drains.
            cancel::terminate(pid);
            return Err(err.into());
        }
    }

    if trailer_rx.recv().is_ok() {
        writer.finish()?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    use super::*;
    use pipearmor_frame::{BlockDecoder, BlockWriter};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn encode_session(payload: &[u8]) -> Vec<u8> {
        let mut writer = BlockWriter::new(Vec::new());
        writer.write_block(payload).unwrap();
        writer.finish().unwrap();
        writer.into_inner()
    }

    fn decode_session(wire: &[u8]) -> (Vec<u8>, bool) {
        let mut decoder = BlockDecoder::new(Vec::new());
        decoder.feed(wire).unwrap();
        let finished = decoder.finished();
        (decoder.into_inner(), finished)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encodes_child_stdout_with_trailer() {
        let downstream = SharedBuf::default();
        let options = WrapOptions {
            encode_stdout: true,
            ..WrapOptions::default()
        };
        let status = run_wrapped_io("echo", &args(&["hi"]), options, io::empty(), downstream.clone())
            .unwrap();
        assert!(status.success());

        let wire = downstream.contents();
        assert_eq!(wire.first(), Some(&b'<'));
        assert_eq!(wire.last(), Some(&b'Z'));
        let (payload, finished) = decode_session(&wire);
        assert_eq!(payload, b"hi\n");
        assert!(finished);
    }

    #[test]
    fn roundtrips_through_a_copying_child() {
        let payload = b"between <these> _markers_ lies Z data".to_vec();
        let downstream = SharedBuf::default();
        let options = WrapOptions {
            decode_stdin: true,
            encode_stdout: true,
        };
        let status = run_wrapped_io(
            "cat",
            &[],
            options,
            Cursor::new(encode_session(&payload)),
            downstream.clone(),
        )
        .unwrap();
        assert!(status.success());

        let (decoded, finished) = decode_session(&downstream.contents());
        assert_eq!(decoded, payload);
        assert!(finished);
    }

    #[test]
    fn decodes_framed_stdin_for_the_child() {
        let options = WrapOptions {
            decode_stdin: true,
            ..WrapOptions::default()
        };
        let status = run_wrapped_io(
            "sh",
            &args(&["-c", "cat >/dev/null"]),
            options,
            Cursor::new(encode_session(b"all of this is consumed")),
            Vec::new(),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn truncated_upstream_cancels_the_child() {
        let options = WrapOptions {
            decode_stdin: true,
            encode_stdout: true,
        };
        let err = run_wrapped_io(
            "cat",
            &[],
            options,
            Cursor::new(b"<never closed".to_vec()),
            SharedBuf::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::UpstreamTruncated));
    }

    #[test]
    fn truncated_upstream_leaves_no_trailer() {
        let downstream = SharedBuf::default();
        let options = WrapOptions {
            decode_stdin: true,
            encode_stdout: true,
        };
        let _ = run_wrapped_io(
            "cat",
            &[],
            options,
            Cursor::new(b"<partial>".to_vec()),
            downstream.clone(),
        )
        .unwrap_err();
        let (_, finished) = decode_session(&downstream.contents());
        assert!(!finished);
    }

    #[test]
    fn malformed_escape_is_fatal() {
        let options = WrapOptions {
            decode_stdin: true,
            ..WrapOptions::default()
        };
        let err = run_wrapped_io(
            "cat",
            &[],
            options,
            Cursor::new(b"<bad_escape here".to_vec()),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExecError::Frame(FrameError::InvalidEscape { byte: b'e' })
        ));
    }

    #[test]
    fn failing_child_skips_the_trailer() {
        let downstream = SharedBuf::default();
        let options = WrapOptions {
            encode_stdout: true,
            ..WrapOptions::default()
        };
        let status =
            run_wrapped_io("false", &[], options, io::empty(), downstream.clone()).unwrap();
        assert!(!status.success());
        assert!(downstream.contents().is_empty());
    }

    #[test]
    fn child_that_ignores_its_input_completes_normally() {
        let options = WrapOptions {
            decode_stdin: true,
            ..WrapOptions::default()
        };
        let status = run_wrapped_io(
            "true",
            &[],
            options,
            Cursor::new(encode_session(&vec![b'x'; 256 * 1024])),
            Vec::new(),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn unwrapped_run_reports_the_child_status() {
        let status = run_wrapped_io(
            "true",
            &[],
            WrapOptions::default(),
            io::empty(),
            Vec::new(),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn unstartable_program_is_a_spawn_error() {
        let err = run_wrapped_io(
            "/definitely/not/a/binary",
            &[],
            WrapOptions::default(),
            io::empty(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
