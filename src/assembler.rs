//! Multi-part assembly
//!
//! Collects decoded *binary* parts belonging to one logical file and
//! concatenates them in ascending part order into a single artifact. Like
//! the decoder, the assembler reports incomplete or mismatching input as
//! [`Validity`] on the returned buffer; only parts that plainly do not
//! belong together are errors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::content::{ContentBuffer, ContentKind, Validity};
use crate::error::{CodecError, Result};

/// Bytes copied per step when concatenating parts
const COPY_CHUNK: usize = 64 * 1024;

/// Collects decoded parts and assembles them into one file
///
/// Parts may arrive in any order; output is deterministic in the declared
/// part index. A duplicate index replaces the earlier payload (the
/// later-added part wins) and poisons the result as
/// [`Validity::Corrupt`].
///
/// # Example
///
/// ```no_run
/// use yenc_codec::{Decoder, PartAssembler};
///
/// # fn main() -> yenc_codec::Result<()> {
/// let work_dir = std::env::temp_dir();
/// let decoder = Decoder::new(&work_dir);
/// let mut assembler = PartAssembler::new(&work_dir);
/// for article in [&b"..."[..], &b"..."[..]] {
///     if let Some(part) = decoder.decode_bytes(article)? {
///         assembler.add(part)?;
///     }
/// }
/// let file = assembler.assemble()?;
/// assert!(file.is_valid());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PartAssembler {
    work_dir: PathBuf,
    parts: BTreeMap<u32, ContentBuffer>,
    duplicate: bool,
}

impl PartAssembler {
    /// Create an assembler writing its output backing under `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            parts: BTreeMap::new(),
            duplicate: false,
        }
    }

    /// Add a decoded part
    ///
    /// Fails when the buffer is not binary, carries no part index, or
    /// does not match the filename/part count of the parts already added.
    pub fn add(&mut self, part: ContentBuffer) -> Result<()> {
        if part.kind() != ContentKind::Binary {
            return Err(CodecError::Assembly(
                "only binary parts can be assembled".to_string(),
            ));
        }
        if part.part == 0 {
            return Err(CodecError::Assembly(
                "buffer is not part of a multi-part stream".to_string(),
            ));
        }
        if part.total_parts > 0 && part.part > part.total_parts {
            return Err(CodecError::Assembly(format!(
                "part index {} outside declared total {}",
                part.part, part.total_parts
            )));
        }
        if let Some(existing) = self.parts.values().next() {
            if existing.filename != part.filename {
                return Err(CodecError::Assembly(format!(
                    "filename mismatch: expected {:?}, got {:?}",
                    existing.filename, part.filename
                )));
            }
            if existing.total_parts != part.total_parts {
                return Err(CodecError::Assembly(format!(
                    "part count mismatch: expected {}, got {}",
                    existing.total_parts, part.total_parts
                )));
            }
        }
        let index = part.part;
        if self.parts.insert(index, part).is_some() {
            warn!(part = index, "duplicate part index, later data wins");
            self.duplicate = true;
        }
        Ok(())
    }

    /// Number of distinct parts collected so far
    pub fn parts_received(&self) -> usize {
        self.parts.len()
    }

    /// Declared part count, once at least one part has been added
    pub fn total_parts(&self) -> Option<u32> {
        self.parts.values().next().map(|part| part.total_parts)
    }

    /// Part indices still missing from the declared range
    pub fn missing_parts(&self) -> Vec<u32> {
        match self.expected_total() {
            Some(total) => (1..=total).filter(|index| !self.parts.contains_key(index)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether every declared part has been collected
    pub fn is_complete(&self) -> bool {
        self.expected_total()
            .is_some_and(|total| self.parts.len() == total as usize)
    }

    /// Declared total, falling back to the highest seen index when the
    /// sender never declared one
    fn expected_total(&self) -> Option<u32> {
        let declared = self.total_parts()?;
        if declared > 0 {
            Some(declared)
        } else {
            self.parts.keys().next_back().copied()
        }
    }

    /// Concatenate the collected parts into one binary artifact
    ///
    /// Consumes the assembler; part backings are released as it returns.
    /// Missing parts or a length short of the declared file size mark the
    /// output [`Validity::Truncated`]; duplicates and a whole-file CRC
    /// mismatch mark it [`Validity::Corrupt`].
    pub fn assemble(self) -> Result<ContentBuffer> {
        let first = self
            .parts
            .values()
            .next()
            .ok_or_else(|| CodecError::Assembly("no parts to assemble".to_string()))?;
        let total = self.expected_total().unwrap_or(0);
        let declared_file_size = first.declared_file_size;

        let mut out = ContentBuffer::new(ContentKind::Binary, &self.work_dir);
        out.filename = first.filename.clone();
        out.total_parts = first.total_parts;
        out.declared_size = declared_file_size;
        out.declared_file_size = declared_file_size;

        let mut missing = Vec::new();
        for index in 1..=total {
            let Some(part) = self.parts.get(&index) else {
                missing.push(index);
                continue;
            };
            let mut offset = 0u64;
            while offset < part.len() {
                let chunk = part.read_range(offset, COPY_CHUNK)?;
                out.append(&chunk)?;
                offset += chunk.len() as u64;
            }
        }

        let declared_crc = self
            .parts
            .get(&total)
            .and_then(|part| part.declared_file_crc32);
        let actual = out.crc32();
        out.declared_crc32 = declared_crc;
        out.declared_file_crc32 = declared_crc;

        // a short artifact is truncation even when the declared CRC cannot
        // match anymore; corruption is reserved for full-length mismatches
        out.valid = if self.duplicate {
            warn!("assembly poisoned by a duplicate part index");
            Validity::Corrupt
        } else if !missing.is_empty() {
            warn!(?missing, "assembly incomplete");
            Validity::Truncated
        } else if out.len() < declared_file_size {
            warn!(
                received = out.len(),
                declared = declared_file_size,
                "assembled file shorter than declared"
            );
            Validity::Truncated
        } else if declared_crc.is_some_and(|crc| crc != actual) {
            warn!(
                declared = %format_args!("{:08x}", declared_crc.unwrap_or(0)),
                actual = %format_args!("{:08x}", actual),
                "assembled file failed CRC check"
            );
            Validity::Corrupt
        } else if out.len() > declared_file_size {
            Validity::Corrupt
        } else {
            Validity::Ok
        };

        debug!(
            parts = total,
            bytes = out.len(),
            valid = ?out.valid,
            "parts assembled"
        );
        out.finalize();
        Ok(out)
    }
}
