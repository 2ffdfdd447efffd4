//! Streaming yEnc decoder
//!
//! Consumes a line-oriented byte stream, locates the begin/part/end
//! markers, reverses the yEnc byte mapping and validates the declared
//! CRCs. The result is a *binary* [`ContentBuffer`]; corrupt or truncated
//! payloads come back as buffers with the matching [`Validity`], while a
//! stream with no usable begin header yields the `Ok(None)` sentinel.

use std::io::BufRead;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::content::{ContentBuffer, ContentKind, Validity};
use crate::error::Result;
use crate::header::{self, ControlLine, EndLine, Expected, Keyword, PartLine};
use crate::transform;

/// Streaming yEnc decoder
///
/// One instance holds plain configuration and owns nothing; it may be
/// reused across streams but each `decode` call runs a single-use pass
/// over one input.
///
/// # Example
///
/// ```
/// use yenc_codec::Decoder;
///
/// let input = b"=ybegin line=128 size=4 name=test.txt\r\n\
///               \x7e\x8f\x9d\x9e\r\n\
///               =yend size=4 crc32=784dd132\r\n";
///
/// let decoder = Decoder::new(std::env::temp_dir());
/// let content = decoder.decode_bytes(input).unwrap().expect("yEnc framed");
/// assert_eq!(content.getvalue().unwrap(), b"Test");
/// assert!(content.is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    work_dir: PathBuf,
    max_bytes: Option<u64>,
    fast_path: bool,
}

impl Decoder {
    /// Create a decoder writing temp-file backings under `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            max_bytes: None,
            fast_path: true,
        }
    }

    /// Stop decoding once the output reaches `limit` bytes
    ///
    /// The remainder of the stream is still scanned for the trailer, but
    /// the returned buffer holds exactly `limit` bytes and is marked
    /// [`Validity::Truncated`]. A way of peeking at large parts.
    pub fn max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    /// Select the accelerated or the reference byte transform
    ///
    /// Both produce identical output; this exists so tests and debugging
    /// can pin either implementation per instance.
    pub fn fast_path(mut self, enabled: bool) -> Self {
        self.fast_path = enabled;
        self
    }

    /// Decode one yEnc stream from an in-memory slice
    pub fn decode_bytes(&self, input: &[u8]) -> Result<Option<ContentBuffer>> {
        self.decode(input)
    }

    /// Decode one yEnc stream from a line-oriented reader
    ///
    /// Returns `Ok(None)` when no `=ybegin` header is found or a
    /// recognized control line is malformed; I/O failures propagate as
    /// errors and release any temp backing. Everything else, including
    /// corrupt CRCs and early EOF, is a returned buffer whose `valid`
    /// field tells the story.
    pub fn decode<R: BufRead>(&self, mut input: R) -> Result<Option<ContentBuffer>> {
        let mut raw = Vec::with_capacity(1024);

        // scan for the begin header; anything before it is article noise
        let begin = loop {
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                return Ok(None);
            }
            let line = transform::trim_line_end(&raw);
            if !line.starts_with(b"=y") {
                continue;
            }
            let text = String::from_utf8_lossy(line);
            match header::keyword(&text) {
                Some(Keyword::Begin) => match header::detect(&text, Expected::Begin, true) {
                    Some(ControlLine::Begin(begin)) => break begin,
                    _ => {
                        warn!(line = %text, "malformed begin header");
                        return Ok(None);
                    }
                },
                // stray =ypart/=yend from an earlier article: keep scanning
                _ => continue,
            }
        };

        if let (Some(part), Some(total)) = (begin.part, begin.total) {
            if part > total {
                warn!(part, total, "part index outside declared total");
                return Ok(None);
            }
        }

        debug!(
            name = %begin.name,
            size = begin.size,
            part = ?begin.part,
            total = ?begin.total,
            "begin header accepted"
        );

        let mut content = ContentBuffer::new(ContentKind::Binary, &self.work_dir);
        content.filename = Some(begin.name);
        content.part = begin.part.unwrap_or(0);
        content.total_parts = begin.total.unwrap_or(0);
        content.declared_size = begin.size; // refined by =ypart and =yend
        content.declared_file_size = begin.size;

        let mut part_range: Option<PartLine> = None;
        let mut draining = false;
        let mut scratch = Vec::with_capacity(1024);

        loop {
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                warn!(received = content.len(), "stream ended before =yend");
                content.valid = Validity::Truncated;
                content.finalize();
                return Ok(Some(content));
            }
            let terminated = raw.ends_with(b"\n");
            let line = transform::trim_line_end(&raw);

            if line.starts_with(b"=y") {
                let text = String::from_utf8_lossy(line);
                match header::keyword(&text) {
                    Some(Keyword::Part) => {
                        match header::detect(&text, Expected::Part, true) {
                            Some(ControlLine::Part(part)) => {
                                if part_range.is_none() && content.is_empty() {
                                    content.declared_size = part.end - part.begin + 1;
                                    part_range = Some(part);
                                } else {
                                    warn!(line = %text, "extra =ypart line ignored");
                                }
                            }
                            _ => {
                                warn!(line = %text, "malformed =ypart line");
                                return Ok(None);
                            }
                        }
                        continue;
                    }
                    Some(Keyword::End) => match header::detect(&text, Expected::End, true) {
                        Some(ControlLine::End(end)) => {
                            return Ok(Some(finish(content, part_range, end, draining)));
                        }
                        _ => {
                            warn!(line = %text, "malformed =yend line");
                            return Ok(None);
                        }
                    },
                    Some(Keyword::Begin) => {
                        warn!(line = %text, "unexpected =ybegin inside body ignored");
                        continue;
                    }
                    // a data line that merely starts with `=y`
                    None => {}
                }
            }

            // a data fragment cut off mid-line at EOF cannot be trusted;
            // control lines above still parse, so a trailer without a
            // final newline is honored
            if draining || !terminated {
                continue;
            }
            scratch.clear();
            if self.fast_path {
                transform::decode_line_fast(line, &mut scratch);
            } else {
                transform::decode_line_slow(line, &mut scratch);
            }
            if let Some(limit) = self.max_bytes {
                let room = limit.saturating_sub(content.len()) as usize;
                if scratch.len() >= room {
                    content.append(&scratch[..room])?;
                    draining = true;
                    debug!(limit, "byte limit reached, draining remainder of part");
                    continue;
                }
            }
            content.append(&scratch)?;
        }
    }
}

/// Apply the trailer to the decoded content and settle its validity
fn finish(
    mut content: ContentBuffer,
    part_range: Option<PartLine>,
    end: EndLine,
    draining: bool,
) -> ContentBuffer {
    let multipart = content.part != 0 || part_range.is_some();
    content.declared_size = end.size;
    content.declared_crc32 = if multipart {
        end.pcrc32
    } else {
        end.pcrc32.or(end.crc32)
    };
    content.declared_file_crc32 = end.crc32;

    let actual = content.crc32();
    let part_crc_bad = end.pcrc32.is_some_and(|crc| crc != actual);
    let file_crc_bad = !multipart && end.crc32.is_some_and(|crc| crc != actual);

    content.valid = if draining || content.len() < end.size {
        Validity::Truncated
    } else if content.len() > end.size || part_crc_bad || file_crc_bad {
        Validity::Corrupt
    } else {
        Validity::Ok
    };

    match content.valid {
        Validity::Ok => debug!(bytes = content.len(), crc32 = %format_args!("{:08x}", actual), "part decoded"),
        Validity::Truncated => warn!(
            received = content.len(),
            declared = end.size,
            "part truncated"
        ),
        Validity::Corrupt => warn!(
            declared = ?content.declared_crc32.map(|c| format!("{:08x}", c)),
            actual = %format_args!("{:08x}", actual),
            "part failed CRC or size check"
        ),
    }

    content.finalize();
    content
}
