//! yEnc codec core for Usenet content handling
//!
//! yEnc is the binary-to-text encoding carrying most binary content on
//! Usenet: each byte is offset by 42 (mod 256) and the handful of values
//! that would collide with line framing are escaped. This crate is the
//! codec core of that pipeline:
//!
//! - [`Decoder`] — streaming decoder: finds the `=ybegin`/`=ypart`/`=yend`
//!   markers in a line-oriented byte stream, reverses the byte mapping and
//!   validates the declared CRCs
//! - [`Encoder`] — produces complete yEnc framings, one lazy part at a
//!   time, with line wrapping, escaping and CRC trailers
//! - [`PartAssembler`] — puts decoded multi-part streams back together in
//!   part order and verifies the whole-file CRC
//! - [`ContentBuffer`] — the container both sides share: a growable byte
//!   sink that spills to a temp file past a threshold, tagged binary or
//!   ascii, carrying the part metadata
//! - [`detect`] / [`parse_subject`] — the control-line grammar and the
//!   article-subject form that identifies yEnc postings
//! - [`Codec`] / [`Pipeline`] — the composition seam for chaining codecs
//!
//! Corrupt and truncated payloads are values, not errors: every decoded
//! buffer carries a [`Validity`] the caller inspects. Transport, storage
//! and posting workflow live outside this crate; the decoder expects its
//! input with NNTP dot-stuffing already removed.
//!
//! # Example
//!
//! ```
//! use yenc_codec::{ContentBuffer, ContentKind, Decoder, Encoder};
//!
//! # fn main() -> yenc_codec::Result<()> {
//! let work_dir = std::env::temp_dir();
//!
//! let mut source = ContentBuffer::new(ContentKind::Binary, &work_dir);
//! source.filename = Some("hello.txt".to_string());
//! source.append(b"Hello, yEnc!")?;
//!
//! let encoded = Encoder::new(&work_dir).encode_single(&source)?;
//!
//! let decoder = Decoder::new(&work_dir);
//! let decoded = decoder.decode_bytes(&encoded.getvalue()?)?.expect("yEnc framed");
//! assert_eq!(decoded.getvalue()?, b"Hello, yEnc!");
//! assert!(decoded.is_valid());
//! # Ok(())
//! # }
//! ```

/// Multi-part assembly
pub mod assembler;
/// Content containers for decoded and encoded payloads
pub mod content;
/// Streaming yEnc decoder
pub mod decoder;
/// yEnc encoder
pub mod encoder;
mod error;
/// yEnc control-line grammar
pub mod header;
/// Codec composition
pub mod pipeline;
/// Article subject parsing for yEnc postings
pub mod subject;
mod transform;

pub use assembler::PartAssembler;
pub use content::{ContentBuffer, ContentKind, ContentReader, DEFAULT_SPILL_THRESHOLD, Validity};
pub use decoder::Decoder;
pub use encoder::{
    DEFAULT_LINE_LENGTH, Encoder, EncoderOptions, MAX_LINE_LENGTH, MIN_LINE_LENGTH, Parts,
};
pub use error::{CodecError, Result};
pub use header::{BeginLine, ControlLine, EndLine, Expected, Keyword, PartLine, detect, keyword};
pub use pipeline::{Codec, Pipeline, YencCodec};
pub use subject::{ArticleSubject, format_subject, parse_subject};
