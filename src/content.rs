//! Content containers for decoded and encoded payloads
//!
//! A [`ContentBuffer`] behaves as a growable byte sink with yEnc metadata
//! attached. Small payloads live in memory; once a buffer grows past its
//! spill threshold the bytes move to a uniquely owned temp file inside
//! `save_dir`, invisibly to callers. Dropping the buffer removes any
//! backing file on every exit path.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use md5::{Digest, Md5};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CodecError, Result};

/// Default in-memory size before a buffer spills to a temp file (1 MiB)
pub const DEFAULT_SPILL_THRESHOLD: usize = 1024 * 1024;

/// Payload flavor carried by a [`ContentBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Raw decoded bytes: decoder output, encoder input
    Binary,
    /// A complete yEnc-framed part: encoder output, decoder input
    Ascii,
}

/// Structural soundness of a decoded or assembled payload
///
/// Buffers start out `Truncated` (the stream has not finished) and are
/// promoted or demoted when the producer finalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// Every declared check passed
    Ok,
    /// Stream ended early, a part was missing, or a byte limit cut decoding short
    #[default]
    Truncated,
    /// A declared CRC32 did not match the computed one
    Corrupt,
}

enum Backing {
    Memory(Vec<u8>),
    Spilled(NamedTempFile),
}

/// A growable byte container with yEnc part metadata
///
/// Produced by the decoder (binary) and the encoder (ascii); consumed by
/// the encoder, the assembler, and codec pipelines. Appending past the
/// spill threshold transparently moves the payload into a temp file under
/// `save_dir`; the file is owned by exactly this buffer and deleted when
/// the buffer drops.
pub struct ContentBuffer {
    kind: ContentKind,
    backing: Backing,
    len: u64,
    threshold: usize,
    save_dir: PathBuf,
    finalized: bool,
    crc: Hasher,
    digest: Md5,

    /// Logical filename this buffer represents
    pub filename: Option<String>,
    /// 1-based part index, 0 when not part of a multi-part stream
    pub part: u32,
    /// Declared part count, 0 when unknown
    pub total_parts: u32,
    /// Sender-declared payload length for this part
    pub declared_size: u64,
    /// Sender-declared length of the whole assembled file
    pub declared_file_size: u64,
    /// Sender-declared CRC32 of this part's decoded bytes
    pub declared_crc32: Option<u32>,
    /// Sender-declared CRC32 of the whole assembled file (last part only)
    pub declared_file_crc32: Option<u32>,
    /// Outcome of the declared checks, set when the producer finalizes
    pub valid: Validity,
}

impl ContentBuffer {
    /// Create an empty buffer backed by memory until [`DEFAULT_SPILL_THRESHOLD`]
    pub fn new(kind: ContentKind, save_dir: impl Into<PathBuf>) -> Self {
        Self::with_threshold(kind, save_dir, DEFAULT_SPILL_THRESHOLD)
    }

    /// Create an empty buffer with an explicit spill threshold
    pub fn with_threshold(kind: ContentKind, save_dir: impl Into<PathBuf>, threshold: usize) -> Self {
        Self {
            kind,
            backing: Backing::Memory(Vec::new()),
            len: 0,
            threshold,
            save_dir: save_dir.into(),
            finalized: false,
            crc: Hasher::new(),
            digest: Md5::new(),
            filename: None,
            part: 0,
            total_parts: 0,
            declared_size: 0,
            declared_file_size: 0,
            declared_crc32: None,
            declared_file_crc32: None,
            valid: Validity::default(),
        }
    }

    /// Payload flavor of this buffer
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Logical payload length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the buffer holds no payload
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every declared check passed
    pub fn is_valid(&self) -> bool {
        self.valid == Validity::Ok
    }

    /// Directory receiving this buffer's temp-file backing
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Path of the temp-file backing, if the buffer has spilled
    pub fn backing_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::Spilled(file) => Some(file.path()),
        }
    }

    /// Append bytes to the end of the payload
    ///
    /// Fails with [`CodecError::BufferFinalized`] once the producer has
    /// finalized the buffer.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(CodecError::BufferFinalized);
        }
        self.crc.update(bytes);
        self.digest.update(bytes);
        match &mut self.backing {
            Backing::Memory(buf) => {
                if buf.len() + bytes.len() > self.threshold {
                    std::fs::create_dir_all(&self.save_dir)?;
                    let mut file = NamedTempFile::new_in(&self.save_dir)?;
                    file.write_all(buf)?;
                    file.write_all(bytes)?;
                    debug!(
                        path = %file.path().display(),
                        len = self.len + bytes.len() as u64,
                        "content spilled to disk"
                    );
                    self.backing = Backing::Spilled(file);
                } else {
                    buf.extend_from_slice(bytes);
                }
            }
            Backing::Spilled(file) => {
                let mut backing = file.as_file();
                backing.seek(SeekFrom::End(0))?;
                backing.write_all(bytes)?;
            }
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Read up to `len` bytes starting at `offset`
    ///
    /// The range is clamped to the payload, so a read past the end returns
    /// a short (possibly empty) vector.
    pub fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let avail = self.len.saturating_sub(offset).min(len as u64) as usize;
        let mut out = vec![0u8; avail];
        if avail == 0 {
            return Ok(out);
        }
        match &self.backing {
            Backing::Memory(buf) => {
                let start = offset as usize;
                out.copy_from_slice(&buf[start..start + avail]);
            }
            Backing::Spilled(file) => {
                let mut backing = file.as_file();
                backing.seek(SeekFrom::Start(offset))?;
                backing.read_exact(&mut out)?;
            }
        }
        Ok(out)
    }

    /// Copy the whole payload into memory
    pub fn getvalue(&self) -> Result<Vec<u8>> {
        self.read_range(0, self.len as usize)
    }

    /// Streaming reader over the payload
    ///
    /// Spilled buffers are re-opened read-only so the reader does not
    /// disturb the append position.
    pub fn reader(&self) -> Result<ContentReader<'_>> {
        match &self.backing {
            Backing::Memory(buf) => Ok(ContentReader::Memory(buf)),
            Backing::Spilled(file) => Ok(ContentReader::File(BufReader::new(File::open(file.path())?))),
        }
    }

    /// CRC32 of every byte appended so far
    pub fn crc32(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// MD5 digest of every byte appended so far
    pub fn md5(&self) -> [u8; 16] {
        self.digest.clone().finalize().into()
    }

    /// Mark the buffer complete; the payload is read-only afterwards
    pub fn finalize(&mut self) {
        self.finalized = true;
    }
}

impl std::fmt::Debug for ContentBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentBuffer")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .field("filename", &self.filename)
            .field("part", &self.part)
            .field("total_parts", &self.total_parts)
            .field("valid", &self.valid)
            .field("spilled", &matches!(self.backing, Backing::Spilled(_)))
            .finish_non_exhaustive()
    }
}

/// Reader returned by [`ContentBuffer::reader`]
pub enum ContentReader<'a> {
    /// In-memory payload
    Memory(&'a [u8]),
    /// Re-opened temp-file backing
    File(BufReader<File>),
}

impl Read for ContentReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ContentReader::Memory(slice) => slice.read(buf),
            ContentReader::File(reader) => reader.read(buf),
        }
    }
}
