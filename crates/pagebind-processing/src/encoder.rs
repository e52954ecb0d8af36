//! Document encoder collaborator
//!
//! [`PdfEncoder`] builds the output PDF with lopdf. JPEG data is embedded
//! untouched as a `DCTDecode` image; PNG data and raw pixel buffers are stored
//! as `FlateDecode` images with any alpha channel split into an `SMask`.

use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use img_parts::jpeg::Jpeg;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pagebind_core::{EmbeddedImage, ImageHandle};

use crate::decoder::{PixelLayout, RawImage};

const PDF_VERSION: &str = "1.7";
const PRODUCER: &str = concat!("pagebind ", env!("CARGO_PKG_VERSION"));
const IMAGE_RESOURCE: &[u8] = b"Im0";

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Invalid JPEG data: {0}")]
    Jpeg(String),

    #[error("Invalid PNG data: {0}")]
    Png(String),

    #[error("Invalid raster: {0}")]
    Raster(String),

    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Unknown image handle {0:?}")]
    UnknownImage(ImageHandle),

    #[error("Failed to write document: {0}")]
    Finish(String),
}

/// Produces a finished multi-page document from embedded images.
pub trait DocumentEncoder: Send {
    /// Embed baseline or progressive JPEG bytes as-is.
    fn embed_jpeg(&mut self, data: Bytes) -> Result<EmbeddedImage, EncodeError>;

    fn embed_png(&mut self, data: &[u8]) -> Result<EmbeddedImage, EncodeError>;

    /// Embed an uncompressed pixel buffer.
    fn embed_raw(&mut self, image: &RawImage<'_>) -> Result<EmbeddedImage, EncodeError>;

    /// Append a page of exactly the image's size, with the image filling it.
    fn add_page(&mut self, image: &EmbeddedImage) -> Result<(), EncodeError>;

    fn page_count(&self) -> usize;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeError>;
}

/// lopdf-backed PDF encoder.
pub struct PdfEncoder {
    doc: Document,
    pages_id: ObjectId,
    images: Vec<ObjectId>,
    page_ids: Vec<ObjectId>,
}

impl PdfEncoder {
    pub fn new() -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            images: Vec::new(),
            page_ids: Vec::new(),
        }
    }

    fn register(&mut self, stream: Stream, width: u32, height: u32) -> EmbeddedImage {
        let id = self.doc.add_object(stream);
        let handle = ImageHandle(self.images.len() as u32);
        self.images.push(id);
        EmbeddedImage {
            handle,
            width,
            height,
        }
    }

    /// Store 8-bit samples as a Flate image, with an optional alpha plane.
    fn embed_flate(
        &mut self,
        width: u32,
        height: u32,
        color_space: &'static str,
        samples: &[u8],
        alpha: Option<&[u8]>,
    ) -> Result<EmbeddedImage, EncodeError> {
        let mut dict = image_dict(width, height, color_space, "FlateDecode");
        if let Some(alpha) = alpha {
            let smask = Stream::new(
                image_dict(width, height, "DeviceGray", "FlateDecode"),
                deflate(alpha)?,
            );
            let smask_id = self.doc.add_object(smask);
            dict.set("SMask", Object::Reference(smask_id));
        }
        let stream = Stream::new(dict, deflate(samples)?);
        Ok(self.register(stream, width, height))
    }
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentEncoder for PdfEncoder {
    fn embed_jpeg(&mut self, data: Bytes) -> Result<EmbeddedImage, EncodeError> {
        let header = read_jpeg_header(data.clone())?;
        let color_space = match header.components {
            1 => "DeviceGray",
            3 => "DeviceRGB",
            4 => "DeviceCMYK",
            n => return Err(EncodeError::Jpeg(format!("unsupported component count {}", n))),
        };

        let mut dict = image_dict(header.width, header.height, color_space, "DCTDecode");
        if header.components == 4 && header.adobe {
            // Adobe CMYK JPEGs store inverted samples.
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
            );
        }
        let stream = Stream::new(dict, data.to_vec());
        Ok(self.register(stream, header.width, header.height))
    }

    fn embed_png(&mut self, data: &[u8]) -> Result<EmbeddedImage, EncodeError> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| EncodeError::Png(e.to_string()))?;
        let (width, height) = (img.width(), img.height());

        if img.color().has_alpha() {
            let rgba = img.to_rgba8().into_raw();
            let (rgb, alpha) = split_alpha(&rgba);
            self.embed_flate(width, height, "DeviceRGB", &rgb, Some(&alpha))
        } else if !img.color().has_color() {
            let luma = img.to_luma8().into_raw();
            self.embed_flate(width, height, "DeviceGray", &luma, None)
        } else {
            let rgb = img.to_rgb8().into_raw();
            self.embed_flate(width, height, "DeviceRGB", &rgb, None)
        }
    }

    fn embed_raw(&mut self, image: &RawImage<'_>) -> Result<EmbeddedImage, EncodeError> {
        let expected = image.width as usize * image.height as usize * image.layout.channels();
        if image.pixels.len() != expected || image.width == 0 || image.height == 0 {
            return Err(EncodeError::Raster(format!(
                "{}x{} buffer has {} bytes",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }

        match image.layout {
            PixelLayout::Rgb8 => {
                self.embed_flate(image.width, image.height, "DeviceRGB", image.pixels, None)
            }
            PixelLayout::Rgba8 => {
                let (rgb, alpha) = split_alpha(image.pixels);
                self.embed_flate(image.width, image.height, "DeviceRGB", &rgb, Some(&alpha))
            }
        }
    }

    fn add_page(&mut self, image: &EmbeddedImage) -> Result<(), EncodeError> {
        let image_id = *self
            .images
            .get(image.handle.0 as usize)
            .ok_or(EncodeError::UnknownImage(image.handle))?;
        let (w, h) = (i64::from(image.width), i64::from(image.height));

        // Unit square scaled to the page, origin bottom-left.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(w),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(h),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| EncodeError::Finish(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(w),
                Object::Integer(h),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => xobjects,
            },
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeError> {
        let PdfEncoder {
            mut doc,
            pages_id,
            page_ids,
            ..
        } = *self;

        let count = page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| EncodeError::Finish(e.to_string()))?;
        Ok(out)
    }
}

fn image_dict(width: u32, height: u32, color_space: &'static str, filter: &'static str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => filter,
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn split_alpha(rgba: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let pixels = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }
    (rgb, alpha)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
    adobe: bool,
}

/// Read frame dimensions and component count from the first SOF segment.
fn read_jpeg_header(data: Bytes) -> Result<JpegHeader, EncodeError> {
    const APP14: u8 = 0xEE;

    let jpeg = Jpeg::from_bytes(data).map_err(|e| EncodeError::Jpeg(e.to_string()))?;
    let adobe = jpeg
        .segments()
        .iter()
        .any(|s| s.marker() == APP14 && s.contents().starts_with(b"Adobe"));

    let sof = jpeg
        .segments()
        .iter()
        .find(|s| is_sof(s.marker()))
        .ok_or_else(|| EncodeError::Jpeg("missing frame header".to_string()))?;

    let c = sof.contents();
    if c.len() < 6 {
        return Err(EncodeError::Jpeg("truncated frame header".to_string()));
    }
    if c[0] != 8 {
        return Err(EncodeError::Jpeg(format!(
            "unsupported sample precision {} bits",
            c[0]
        )));
    }
    let height = u32::from(u16::from_be_bytes([c[1], c[2]]));
    let width = u32::from(u16::from_be_bytes([c[3], c[4]]));
    if width == 0 || height == 0 {
        return Err(EncodeError::Jpeg(format!("invalid frame size {}x{}", width, height)));
    }

    Ok(JpegHeader {
        width,
        height,
        components: c[5],
        adobe,
    })
}

fn is_sof(marker: u8) -> bool {
    // SOF0..SOF15 minus DHT, JPG and DAC.
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn jpeg_fixture(width: u32, height: u32) -> Bytes {
        Bytes::from(encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]))),
            ImageFormat::Jpeg,
        ))
    }

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([0, 0, 255, 128]),
            )),
            ImageFormat::Png,
        )
    }

    fn media_box(doc: &Document, page_id: ObjectId) -> Vec<i64> {
        let page = doc.get_dictionary(page_id).unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_jpeg_header() {
        let header = read_jpeg_header(jpeg_fixture(33, 17)).unwrap();
        assert_eq!((header.width, header.height), (33, 17));
        assert_eq!(header.components, 3);
        assert!(!header.adobe);
    }

    #[test]
    fn test_twelve_bit_jpeg_rejected() {
        let mut data = jpeg_fixture(4, 4).to_vec();
        let sof = data
            .windows(2)
            .position(|w| w == [0xFF, 0xC0])
            .expect("baseline frame marker");
        // Marker, two length bytes, then the precision byte.
        data[sof + 4] = 12;

        assert!(matches!(
            read_jpeg_header(Bytes::from(data.clone())),
            Err(EncodeError::Jpeg(_))
        ));
        assert!(PdfEncoder::new().embed_jpeg(Bytes::from(data)).is_err());
    }

    #[test]
    fn test_jpeg_header_rejects_garbage() {
        assert!(read_jpeg_header(Bytes::from_static(b"not a jpeg")).is_err());
    }

    #[test]
    fn test_embed_jpeg_is_passthrough() {
        let data = jpeg_fixture(8, 8);
        let mut encoder = PdfEncoder::new();
        let embedded = encoder.embed_jpeg(data.clone()).unwrap();
        assert_eq!((embedded.width, embedded.height), (8, 8));

        let id = encoder.images[embedded.handle.0 as usize];
        let stream = encoder.doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content, data.to_vec());
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
    }

    #[test]
    fn test_embed_png_with_alpha_has_smask() {
        let mut encoder = PdfEncoder::new();
        let embedded = encoder.embed_png(&png_fixture(5, 9)).unwrap();
        assert_eq!((embedded.width, embedded.height), (5, 9));

        let id = encoder.images[embedded.handle.0 as usize];
        let stream = encoder.doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_embed_raw_rejects_short_buffer() {
        let pixels = vec![0u8; 5];
        let raw = RawImage {
            width: 2,
            height: 2,
            layout: PixelLayout::Rgb8,
            pixels: &pixels,
        };
        assert!(matches!(
            PdfEncoder::new().embed_raw(&raw),
            Err(EncodeError::Raster(_))
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let mut encoder = PdfEncoder::new();
        let bogus = EmbeddedImage {
            handle: ImageHandle(3),
            width: 1,
            height: 1,
        };
        assert!(matches!(
            encoder.add_page(&bogus),
            Err(EncodeError::UnknownImage(ImageHandle(3)))
        ));
    }

    #[test]
    fn test_pages_sized_to_images_in_order() {
        let mut encoder = Box::new(PdfEncoder::new());
        let first = encoder.embed_jpeg(jpeg_fixture(40, 30)).unwrap();
        let pixels = vec![255u8; 3 * 2 * 4];
        let second = encoder
            .embed_raw(&RawImage::new(3, 2, PixelLayout::Rgba8, &pixels).unwrap())
            .unwrap();
        encoder.add_page(&first).unwrap();
        encoder.add_page(&second).unwrap();
        assert_eq!(encoder.page_count(), 2);

        let bytes = encoder.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[&1]), vec![0, 0, 40, 30]);
        assert_eq!(media_box(&doc, pages[&2]), vec![0, 0, 3, 2]);
    }

    #[test]
    fn test_empty_document_still_finishes() {
        let bytes = Box::new(PdfEncoder::new()).finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }
}
