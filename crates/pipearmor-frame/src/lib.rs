//! Self-delimiting escaped block framing for hostile byte channels.
//!
//! Wraps a raw byte stream so it survives transports that neither
//! preserve write boundaries nor fail loudly when they truncate.
//! Every source-side write becomes one delimited,
//! escaped block; a single trailing end-of-stream marker distinguishes
//! a complete session from a truncated one.
//!
//! A session on the wire:
//!
//! ```text
//! <block><block>...<block>Z
//! ```
//!
//! Inside a block, the three bytes with structural meaning are replaced
//! by two-byte escape pairs:
//!
//! | literal | escaped as |
//! |---------|------------|
//! | `_`     | `_-`       |
//! | `<`     | `_[`       |
//! | `>`     | `_]`       |
//!
//! Blocks are delimited, not length-prefixed; the receiver finds
//! boundaries only by scanning for unescaped markers, so the decoder
//! accepts input split at any byte position. There are no checksums and
//! no multiplexing: one logical stream per direction.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod writer;

pub use codec::{
    encode_block, BLOCK_END, BLOCK_START, END_OF_STREAM, ESCAPE, ESCAPED_END, ESCAPED_ESCAPE,
    ESCAPED_START,
};
pub use decoder::BlockDecoder;
pub use error::{FrameError, Result};
pub use writer::BlockWriter;
