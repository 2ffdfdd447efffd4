//! yEnc encoder
//!
//! Turns a binary [`ContentBuffer`] or a file on disk into one or more
//! *ascii* buffers, each a complete self-contained yEnc framing with
//! header, escaped body lines and CRC trailer. Parts come out of a lazy
//! iterator in strict ascending order; inputs are read chunk-wise so a
//! spilled buffer or a large file never has to fit in memory.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use tracing::debug;

use crate::content::{ContentBuffer, ContentKind, Validity};
use crate::error::{CodecError, Result};
use crate::transform;

/// Default columns per encoded line
pub const DEFAULT_LINE_LENGTH: usize = 128;
/// Smallest accepted line length
pub const MIN_LINE_LENGTH: usize = 16;
/// Largest accepted line length
pub const MAX_LINE_LENGTH: usize = 1024;

/// Fallback advertised filename when neither the options nor the input
/// carry one
const DEFAULT_NAME: &str = "data.bin";

/// Bytes read from the source per encoding step
const ENCODE_CHUNK: usize = 64 * 1024;

/// Tunable encoder parameters
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Columns per encoded line, within `[MIN_LINE_LENGTH, MAX_LINE_LENGTH]`
    pub line_length: usize,
    /// Split the input into parts of at most this many bytes
    pub part_size: Option<u64>,
    /// Filename to advertise; defaults to the input's own name
    pub name: Option<String>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
            part_size: None,
            name: None,
        }
    }
}

/// yEnc encoder
///
/// # Example
///
/// ```
/// use yenc_codec::{ContentBuffer, ContentKind, Encoder};
///
/// let work_dir = std::env::temp_dir();
/// let mut source = ContentBuffer::new(ContentKind::Binary, &work_dir);
/// source.append(b"Hello, World!").unwrap();
/// source.filename = Some("hello.txt".to_string());
///
/// let encoded = Encoder::new(&work_dir).encode_single(&source).unwrap();
/// assert!(encoded.getvalue().unwrap().starts_with(b"=ybegin line=128 size=13 name=hello.txt\r\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    work_dir: PathBuf,
    line_length: usize,
    part_size: Option<u64>,
    name: Option<String>,
    fast_path: bool,
}

impl Encoder {
    /// Create an encoder with default options, writing temp-file backings
    /// under `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            line_length: DEFAULT_LINE_LENGTH,
            part_size: None,
            name: None,
            fast_path: true,
        }
    }

    /// Create an encoder with explicit options
    ///
    /// Fails with [`CodecError::InvalidConfiguration`] when `line_length`
    /// is outside `[MIN_LINE_LENGTH, MAX_LINE_LENGTH]` or `part_size` is
    /// zero; nothing is produced in that case.
    pub fn with_options(work_dir: impl Into<PathBuf>, options: EncoderOptions) -> Result<Self> {
        if !(MIN_LINE_LENGTH..=MAX_LINE_LENGTH).contains(&options.line_length) {
            return Err(CodecError::InvalidConfiguration(format!(
                "line length {} outside [{}, {}]",
                options.line_length, MIN_LINE_LENGTH, MAX_LINE_LENGTH
            )));
        }
        if options.part_size == Some(0) {
            return Err(CodecError::InvalidConfiguration(
                "part size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            work_dir: work_dir.into(),
            line_length: options.line_length,
            part_size: options.part_size,
            name: options.name,
            fast_path: true,
        })
    }

    /// Select the accelerated or the reference byte transform
    pub fn fast_path(mut self, enabled: bool) -> Self {
        self.fast_path = enabled;
        self
    }

    /// Encode a buffer into a lazy sequence of yEnc parts
    ///
    /// The input is normally *binary* content but is treated as an opaque
    /// byte payload, so chained codec stages can re-frame ascii output.
    pub fn encode_buffer<'a>(&self, content: &'a ContentBuffer) -> Result<Parts<'a>> {
        let name = self
            .name
            .clone()
            .or_else(|| content.filename.clone())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        Ok(self.parts(Source::Buffer(content), content.len(), name))
    }

    /// Encode a file on disk into a lazy sequence of yEnc parts
    pub fn encode_path(&self, path: impl AsRef<Path>) -> Result<Parts<'static>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let total_size = file.metadata()?.len();
        let name = self.name.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_NAME.to_string())
        });
        Ok(self.parts(Source::File(file), total_size, name))
    }

    /// Encode a binary buffer into exactly one single-part framing
    ///
    /// Convenience for codec pipelines; any configured `part_size` is
    /// ignored.
    pub fn encode_single(&self, content: &ContentBuffer) -> Result<ContentBuffer> {
        let mut single = self.clone();
        single.part_size = None;
        let mut parts = single.encode_buffer(content)?;
        match parts.next() {
            Some(part) => part,
            None => unreachable!("a single-part encoding always yields one part"),
        }
    }

    fn parts<'a>(&self, source: Source<'a>, total_size: u64, name: String) -> Parts<'a> {
        let part_size = self.part_size.unwrap_or(total_size.max(1));
        let total_parts = (total_size.div_ceil(part_size)).max(1) as u32;
        Parts {
            source,
            name,
            line_length: self.line_length,
            fast_path: self.fast_path,
            work_dir: self.work_dir.clone(),
            total_size,
            part_size,
            total_parts,
            next_part: 1,
            file_crc: Hasher::new(),
            failed: false,
        }
    }
}

enum Source<'a> {
    File(File),
    Buffer(&'a ContentBuffer),
}

impl Source<'_> {
    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        match self {
            Source::File(file) => {
                let mut handle: &File = file;
                handle.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; len];
                handle.read_exact(&mut buf)?;
                Ok(buf)
            }
            Source::Buffer(content) => content.read_range(offset, len),
        }
    }
}

/// Lazy sequence of yEnc-framed parts, ascending part order
///
/// Produced by [`Encoder::encode_buffer`] and [`Encoder::encode_path`].
/// Each item is a finalized *ascii* [`ContentBuffer`]; after the first
/// error the iterator fuses.
pub struct Parts<'a> {
    source: Source<'a>,
    name: String,
    line_length: usize,
    fast_path: bool,
    work_dir: PathBuf,
    total_size: u64,
    part_size: u64,
    total_parts: u32,
    next_part: u32,
    file_crc: Hasher,
    failed: bool,
}

impl Parts<'_> {
    /// Declared part count for this input
    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    fn emit(&mut self, index: u32) -> Result<ContentBuffer> {
        let begin = (u64::from(index) - 1) * self.part_size;
        let end = self.total_size.min(begin + self.part_size);
        let payload_len = end - begin;
        let multipart = self.total_parts > 1;

        let mut out = ContentBuffer::new(ContentKind::Ascii, &self.work_dir);
        out.filename = Some(self.name.clone());

        if multipart {
            out.part = index;
            out.total_parts = self.total_parts;
            out.append(
                format!(
                    "=ybegin part={} total={} line={} size={} name={}\r\n",
                    index, self.total_parts, self.line_length, self.total_size, self.name
                )
                .as_bytes(),
            )?;
            out.append(format!("=ypart begin={} end={}\r\n", begin + 1, end).as_bytes())?;
        } else {
            out.append(
                format!(
                    "=ybegin line={} size={} name={}\r\n",
                    self.line_length, self.total_size, self.name
                )
                .as_bytes(),
            )?;
        }

        let mut part_crc = Hasher::new();
        let mut col = 0usize;
        let mut encoded = Vec::with_capacity(ENCODE_CHUNK + ENCODE_CHUNK / 32);
        let mut offset = begin;
        while offset < end {
            let chunk_len = ((end - offset) as usize).min(ENCODE_CHUNK);
            let chunk = self.source.read_range(offset, chunk_len)?;
            part_crc.update(&chunk);
            self.file_crc.update(&chunk);
            encoded.clear();
            if self.fast_path {
                transform::encode_chunk_fast(&chunk, self.line_length, &mut col, &mut encoded);
            } else {
                transform::encode_chunk_slow(&chunk, self.line_length, &mut col, &mut encoded);
            }
            out.append(&encoded)?;
            offset += chunk_len as u64;
        }
        encoded.clear();
        transform::encode_finish(&mut col, &mut encoded);
        out.append(&encoded)?;

        let pcrc32 = part_crc.finalize();
        out.declared_crc32 = Some(pcrc32);
        if multipart {
            if index == self.total_parts {
                let crc32 = self.file_crc.clone().finalize();
                out.append(
                    format!(
                        "=yend size={} part={} pcrc32={:08x} crc32={:08x}\r\n",
                        payload_len, index, pcrc32, crc32
                    )
                    .as_bytes(),
                )?;
                out.declared_file_crc32 = Some(crc32);
            } else {
                out.append(
                    format!(
                        "=yend size={} part={} pcrc32={:08x}\r\n",
                        payload_len, index, pcrc32
                    )
                    .as_bytes(),
                )?;
            }
        } else {
            out.append(format!("=yend size={} crc32={:08x}\r\n", payload_len, pcrc32).as_bytes())?;
            out.declared_file_crc32 = Some(pcrc32);
        }

        out.declared_size = payload_len;
        out.declared_file_size = self.total_size;
        out.valid = Validity::Ok;
        out.finalize();
        debug!(
            part = index,
            total = self.total_parts,
            bytes = payload_len,
            "part encoded"
        );
        Ok(out)
    }
}

impl Iterator for Parts<'_> {
    type Item = Result<ContentBuffer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_part > self.total_parts {
            return None;
        }
        let index = self.next_part;
        self.next_part += 1;
        match self.emit(index) {
            Ok(part) => Some(Ok(part)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
