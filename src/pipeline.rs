//! Codec composition
//!
//! A [`Codec`] transforms one [`ContentBuffer`] into another; a
//! [`Pipeline`] chains several of them, applying stages forward on encode
//! and backward on decode. The yEnc codec is the one implementation this
//! crate ships, but the seam is deliberately a plain trait so outer layers
//! can slot their own stages into the same chain.

use std::io::BufReader;
use std::path::PathBuf;

use crate::content::ContentBuffer;
use crate::decoder::Decoder;
use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{CodecError, Result};

/// A reversible content transform
pub trait Codec {
    /// Transform a buffer into its encoded form
    fn encode(&self, content: &ContentBuffer) -> Result<ContentBuffer>;

    /// Transform a buffer back into its decoded form
    fn decode(&self, content: &ContentBuffer) -> Result<ContentBuffer>;
}

/// The yEnc [`Codec`]
///
/// Encoding always produces the single-part framing (pipelines move one
/// buffer at a time); decoding maps the decoder's "no begin header"
/// sentinel onto [`CodecError::MalformedHeader`], since a pipeline stage
/// has no way to hand back half a chain.
pub struct YencCodec {
    work_dir: PathBuf,
    encoder: Encoder,
    fast_path: bool,
}

impl YencCodec {
    /// Create a yEnc codec stage working under `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            encoder: Encoder::new(&work_dir),
            work_dir,
            fast_path: true,
        }
    }

    /// Create a yEnc codec stage with explicit encoder options
    pub fn with_options(work_dir: impl Into<PathBuf>, options: EncoderOptions) -> Result<Self> {
        let work_dir = work_dir.into();
        Ok(Self {
            encoder: Encoder::with_options(&work_dir, options)?,
            work_dir,
            fast_path: true,
        })
    }

    /// Select the accelerated or the reference byte transform
    pub fn fast_path(mut self, enabled: bool) -> Self {
        self.fast_path = enabled;
        self
    }
}

impl Codec for YencCodec {
    fn encode(&self, content: &ContentBuffer) -> Result<ContentBuffer> {
        self.encoder
            .clone()
            .fast_path(self.fast_path)
            .encode_single(content)
    }

    fn decode(&self, content: &ContentBuffer) -> Result<ContentBuffer> {
        let decoder = Decoder::new(&self.work_dir).fast_path(self.fast_path);
        let reader = BufReader::new(content.reader()?);
        match decoder.decode(reader)? {
            Some(decoded) => Ok(decoded),
            None => Err(CodecError::MalformedHeader(
                "no yEnc begin header in content".to_string(),
            )),
        }
    }
}

/// An ordered chain of codecs
///
/// `encode` applies the stages first to last; `decode` unwinds them last
/// to first. An empty pipeline passes nothing and is a configuration
/// error at call time.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Codec>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage, builder style
    pub fn with(mut self, codec: Box<dyn Codec>) -> Self {
        self.stages.push(codec);
        self
    }

    /// Append a stage
    pub fn push(&mut self, codec: Box<dyn Codec>) {
        self.stages.push(codec);
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the buffer forward through every stage
    pub fn encode(&self, content: &ContentBuffer) -> Result<ContentBuffer> {
        let mut stages = self.stages.iter();
        let first = stages
            .next()
            .ok_or_else(|| CodecError::InvalidConfiguration("empty pipeline".to_string()))?;
        let mut current = first.encode(content)?;
        for stage in stages {
            current = stage.encode(&current)?;
        }
        Ok(current)
    }

    /// Run the buffer backward through every stage
    pub fn decode(&self, content: &ContentBuffer) -> Result<ContentBuffer> {
        let mut stages = self.stages.iter().rev();
        let first = stages
            .next()
            .ok_or_else(|| CodecError::InvalidConfiguration("empty pipeline".to_string()))?;
        let mut current = first.decode(content)?;
        for stage in stages {
            current = stage.decode(&current)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;

    fn binary(data: &[u8], name: &str) -> ContentBuffer {
        let mut content = ContentBuffer::new(ContentKind::Binary, std::env::temp_dir());
        content.append(data).unwrap();
        content.filename = Some(name.to_string());
        content.finalize();
        content
    }

    #[test]
    fn test_codec_round_trip() {
        let codec = YencCodec::new(std::env::temp_dir());
        let source = binary(b"Hello, World!", "hello.txt");

        let encoded = codec.encode(&source).unwrap();
        assert_eq!(encoded.kind(), ContentKind::Ascii);

        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.getvalue().unwrap(), b"Hello, World!");
        assert_eq!(decoded.crc32(), source.crc32());
        assert_eq!(decoded.md5(), source.md5());
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_decode_non_yenc_is_error() {
        let codec = YencCodec::new(std::env::temp_dir());
        let mut ascii = ContentBuffer::new(ContentKind::Ascii, std::env::temp_dir());
        ascii.append(b"plain text, nothing framed\n").unwrap();
        ascii.finalize();

        assert!(matches!(
            codec.decode(&ascii),
            Err(CodecError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_chained_pipeline_round_trip() {
        // two yEnc stages: the outer framing wraps the inner framing
        let pipeline = Pipeline::new()
            .with(Box::new(YencCodec::new(std::env::temp_dir())))
            .with(Box::new(YencCodec::new(std::env::temp_dir())));
        assert_eq!(pipeline.len(), 2);

        let source = binary(b"nested framing", "inner.bin");
        let encoded = pipeline.encode(&source).unwrap();
        let decoded = pipeline.decode(&encoded).unwrap();
        assert_eq!(decoded.getvalue().unwrap(), b"nested framing");
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_empty_pipeline_is_error() {
        let pipeline = Pipeline::new();
        let source = binary(b"data", "x.bin");
        assert!(matches!(
            pipeline.encode(&source),
            Err(CodecError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            pipeline.decode(&source),
            Err(CodecError::InvalidConfiguration(_))
        ));
    }
}
