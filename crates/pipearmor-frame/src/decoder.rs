use std::io::Write;

use crate::codec::{unescape, BLOCK_END, BLOCK_START, END_OF_STREAM, ESCAPE};
use crate::error::{FrameError, Result};

/// Parser position between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between blocks, waiting for a block start or the end-of-stream marker.
    Idle,
    /// Inside a block, copying payload bytes.
    Block,
    /// Inside a block, directly after an escape introducer.
    Escape,
}

/// Streaming parser that strips block framing and forwards recovered
/// payload bytes to a sink.
///
/// Input may arrive in chunks of any size; the state machine is
/// resumable at every byte boundary, including between an escape
/// introducer and its literal. One instance covers one decoding session
/// and is never reset.
pub struct BlockDecoder<W> {
    sink: W,
    state: State,
    finished: bool,
    scratch: Vec<u8>,
}

impl<W: Write> BlockDecoder<W> {
    /// Create a decoder forwarding recovered payload to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: State::Idle,
            finished: false,
            scratch: Vec::new(),
        }
    }

    /// Feed more upstream bytes into the parser.
    ///
    /// Payload recovered across the whole call is forwarded to the sink
    /// in a single write at the end, preserving order. Returns the
    /// number of input bytes consumed, which is always the full chunk.
    ///
    /// A stray byte in the idle state that is neither a block start nor
    /// the end-of-stream marker is outside the protocol's guarantees and
    /// is skipped; an undefined byte after an escape introducer is a
    /// fatal [`FrameError::InvalidEscape`].
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        self.scratch.clear();
        for &byte in input {
            if self.finished {
                break;
            }
            match self.state {
                State::Idle => match byte {
                    BLOCK_START => self.state = State::Block,
                    END_OF_STREAM => self.finished = true,
                    _ => {}
                },
                State::Block => match byte {
                    ESCAPE => self.state = State::Escape,
                    BLOCK_END => self.state = State::Idle,
                    other => self.scratch.push(other),
                },
                State::Escape => match unescape(byte) {
                    Some(literal) => {
                        self.scratch.push(literal);
                        self.state = State::Block;
                    }
                    None => return Err(FrameError::InvalidEscape { byte }),
                },
            }
        }
        if !self.scratch.is_empty() {
            self.sink.write_all(&self.scratch)?;
        }
        Ok(input.len())
    }

    /// True once the end-of-stream marker has been observed between
    /// blocks. If the upstream stream ends while this is still false,
    /// the transmission was truncated.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consume the decoder and return the inner sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}
