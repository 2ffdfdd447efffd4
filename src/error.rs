//! Codec error types

use thiserror::Error;

/// Errors raised by the yEnc codec core
///
/// Corrupt or truncated payloads are deliberately *not* errors: they come
/// back as buffers whose [`Validity`](crate::Validity) the caller inspects.
/// Only unusable input (no begin header, malformed control lines), failed
/// I/O, and bad configuration surface here.
#[derive(Error, Debug)]
pub enum CodecError {
    /// IO error while reading a source stream or writing temp-file backing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A control line was recognized but failed the header grammar
    #[error("Malformed yEnc header: {0}")]
    MalformedHeader(String),

    /// Codec constructed with out-of-range parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Append attempted on a finalized content buffer
    #[error("Content buffer is finalized")]
    BufferFinalized,

    /// Parts handed to the assembler do not belong to the same file
    #[error("Assembly error: {0}")]
    Assembly(String),
}

/// Result type alias using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;
