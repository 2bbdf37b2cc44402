use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the wire codecs, text codecs and the node loop.
///
/// Decoding errors abort the current message and terminate the connection;
/// unknown commands are not errors (they surface as unsupported messages).
#[derive(Debug, Error)]
pub enum Error {
    /// The stream ended before a field was complete. Carries the name of
    /// the field being read.
    #[error("unexpected end of stream while reading {0}")]
    UnexpectedEof(&'static str),

    /// A structural constraint was violated (unsupported block version,
    /// non-zero transaction count in `headers`, unknown address version
    /// byte, and so on).
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),

    /// A truncated SHA256d checksum did not match, on a message frame or
    /// a Base58Check string.
    #[error("{0}: checksum mismatch")]
    InvalidChecksum(&'static str),

    /// A message frame carried a magic value for a different network.
    #[error("message magic {got:#010x} does not match network magic {want:#010x}")]
    InvalidMagic { got: u32, want: u32 },

    /// A decoded integer does not fit the target width.
    #[error("value out of range for {0}")]
    Overflow(&'static str),

    /// Script push data larger than `u32::MAX` bytes.
    #[error("script push data is too large to encode")]
    LengthOverflow,

    /// Propagated from the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),
}
