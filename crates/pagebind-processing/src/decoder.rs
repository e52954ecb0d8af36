//! Raster decoder collaborator
//!
//! Formats the document encoder cannot embed natively are decoded to a raw
//! pixel buffer first. Each job owns at most one decoder, created lazily on
//! the first item that needs it and released after every item.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::webp::WebPDecoder;
use image::{ColorType, ImageDecoder};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed image data: {0}")]
    Malformed(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    #[error("Decoder initialization failed: {0}")]
    Init(String),
}

/// Channel layout of a raw buffer, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

/// Decoded pixels borrowed from the decoder's working buffer.
///
/// Only valid until the next `decode` or `release` call on the same decoder.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: &'a [u8],
}

impl<'a> RawImage<'a> {
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: &'a [u8],
    ) -> Result<Self, DecodeError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(layout.channels()));
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            return Err(DecodeError::Dimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }
}

pub trait RasterDecoder: Send {
    fn decode<'a>(&'a mut self, data: &[u8]) -> Result<RawImage<'a>, DecodeError>;

    /// Drop the working buffer. The decoder stays usable.
    fn release(&mut self);

    /// Bytes currently held in the working buffer.
    fn retained_bytes(&self) -> usize;
}

/// Builds decoder instances. Creation may be expensive and is awaited.
#[async_trait]
pub trait DecoderFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn RasterDecoder>, DecodeError>;
}

/// Decoded-size ceiling used when none is configured.
pub const DEFAULT_DECODE_BUDGET_BYTES: u64 = 128 * 1024 * 1024;

/// WebP decoder writing straight into a reusable working buffer.
///
/// The bitstream header is read first; images whose decoded size would exceed
/// the budget are refused before any pixel memory is allocated.
#[derive(Debug)]
pub struct WebpDecoder {
    scratch: Vec<u8>,
    max_decoded_bytes: u64,
}

impl WebpDecoder {
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_DECODE_BUDGET_BYTES)
    }

    pub fn with_budget(max_decoded_bytes: u64) -> Self {
        Self {
            scratch: Vec::new(),
            max_decoded_bytes,
        }
    }

    fn check_budget(&self, data: &[u8]) -> Result<(), DecodeError> {
        let features = webp::BitstreamFeatures::new(data)
            .ok_or_else(|| DecodeError::Malformed("not a WebP bitstream".to_string()))?;
        let (width, height) = (features.width(), features.height());
        let channels: u64 = if features.has_alpha() { 4 } else { 3 };
        let decoded = u64::from(width) * u64::from(height) * channels;
        if width == 0 || height == 0 || decoded > self.max_decoded_bytes {
            tracing::warn!(
                width,
                height,
                decoded_bytes = decoded,
                max_decoded_bytes = self.max_decoded_bytes,
                "WebP exceeds decode budget"
            );
            return Err(DecodeError::Dimensions { width, height });
        }
        Ok(())
    }
}

impl Default for WebpDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterDecoder for WebpDecoder {
    fn decode<'a>(&'a mut self, data: &[u8]) -> Result<RawImage<'a>, DecodeError> {
        self.check_budget(data)?;

        let decoder = WebPDecoder::new(Cursor::new(data))
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        let layout = match decoder.color_type() {
            ColorType::Rgb8 => PixelLayout::Rgb8,
            ColorType::Rgba8 => PixelLayout::Rgba8,
            other => {
                return Err(DecodeError::Malformed(format!(
                    "unexpected WebP color type {:?}",
                    other
                )))
            }
        };
        if decoder.total_bytes() > self.max_decoded_bytes {
            return Err(DecodeError::Dimensions { width, height });
        }
        let len = usize::try_from(decoder.total_bytes())
            .map_err(|_| DecodeError::Dimensions { width, height })?;

        self.scratch.clear();
        self.scratch.resize(len, 0);
        decoder
            .read_image(&mut self.scratch)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        RawImage::new(width, height, layout, &self.scratch)
    }

    fn release(&mut self) {
        self.scratch = Vec::new();
    }

    fn retained_bytes(&self) -> usize {
        self.scratch.capacity()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WebpDecoderFactory {
    max_decoded_bytes: u64,
}

impl WebpDecoderFactory {
    pub fn new(max_decoded_bytes: u64) -> Self {
        Self { max_decoded_bytes }
    }
}

impl Default for WebpDecoderFactory {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_BUDGET_BYTES)
    }
}

#[async_trait]
impl DecoderFactory for WebpDecoderFactory {
    async fn create(&self) -> Result<Box<dyn RasterDecoder>, DecodeError> {
        Ok(Box::new(WebpDecoder::with_budget(self.max_decoded_bytes)))
    }
}

/// Per-job decoder slot.
pub struct LazyDecoder {
    factory: Arc<dyn DecoderFactory>,
    slot: Option<Box<dyn RasterDecoder>>,
}

impl LazyDecoder {
    pub fn new(factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            factory,
            slot: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    /// The decoder, creating it on first use.
    pub async fn get(&mut self) -> Result<&mut dyn RasterDecoder, DecodeError> {
        if self.slot.is_none() {
            let decoder = self.factory.create().await?;
            tracing::debug!("Raster decoder initialized for job");
            self.slot = Some(decoder);
        }
        match self.slot.as_deref_mut() {
            Some(decoder) => Ok(decoder),
            None => Err(DecodeError::Init("decoder slot empty".to_string())),
        }
    }

    /// Release the decoder's working memory, if one has been created.
    pub fn release(&mut self) {
        if let Some(decoder) = self.slot.as_deref_mut() {
            decoder.release();
        }
    }
}

impl std::fmt::Debug for LazyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyDecoder")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
