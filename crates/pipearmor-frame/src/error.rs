/// Errors that can occur while encoding or decoding framed blocks.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An escape introducer was followed by a byte outside the escape alphabet.
    #[error("invalid escape byte 0x{byte:02x}")]
    InvalidEscape { byte: u8 },

    /// The sink accepted zero bytes before the encoded block was fully written.
    #[error("sink closed (zero-length write)")]
    SinkClosed,

    /// An I/O error occurred while reading or writing framed bytes.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
