use bytes::{BufMut, BytesMut};

/// Trailing end-of-stream marker: a single unescaped byte, sent once,
/// outside any block, whose receipt between blocks marks the session
/// complete.
pub const END_OF_STREAM: u8 = b'Z';

/// Escape introducer inside a block.
pub const ESCAPE: u8 = b'_';

/// Opens a block.
pub const BLOCK_START: u8 = b'<';

/// Closes a block.
pub const BLOCK_END: u8 = b'>';

/// `ESCAPE ESCAPED_ESCAPE` decodes to a literal `ESCAPE`.
pub const ESCAPED_ESCAPE: u8 = b'-';

/// `ESCAPE ESCAPED_START` decodes to a literal `BLOCK_START`.
pub const ESCAPED_START: u8 = b'[';

/// `ESCAPE ESCAPED_END` decodes to a literal `BLOCK_END`.
pub const ESCAPED_END: u8 = b']';

/// Encode one payload as a complete block into `dst`.
///
/// Wire format:
/// ```text
/// ┌─────────────┬──────────────────────────────┬─────────────┐
/// │ BLOCK_START │ payload, reserved bytes      │ BLOCK_END   │
/// │ `<`         │ escaped to two-byte pairs    │ `>`         │
/// └─────────────┴──────────────────────────────┴─────────────┘
/// ```
///
/// Literal `ESCAPE` bytes are rewritten before the block delimiters, so
/// the single left-to-right pass below emits the same stream as the
/// sequential rewrite. The encoded payload never contains an unescaped
/// `ESCAPE`, `BLOCK_START`, or `BLOCK_END`.
pub fn encode_block(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + 2);
    dst.put_u8(BLOCK_START);
    for &byte in payload {
        match byte {
            ESCAPE => dst.put_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            BLOCK_START => dst.put_slice(&[ESCAPE, ESCAPED_START]),
            BLOCK_END => dst.put_slice(&[ESCAPE, ESCAPED_END]),
            other => dst.put_u8(other),
        }
    }
    dst.put_u8(BLOCK_END);
}

/// Map an escaped-literal byte back to the literal it stands for.
pub(crate) fn unescape(byte: u8) -> Option<u8> {
    match byte {
        ESCAPED_ESCAPE => Some(ESCAPE),
        ESCAPED_START => Some(BLOCK_START),
        ESCAPED_END => Some(BLOCK_END),
        _ => None,
    }
}
