//! Test fixtures: real JPEG/PNG/WebP blobs and PDF inspection helpers.
#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::Document;
use pagebind_core::{ResourceLimits, UploadedItem};

pub fn test_limits() -> ResourceLimits {
    ResourceLimits {
        max_item_count: 8,
        max_item_size_bytes: 256 * 1024,
        max_total_size_bytes: 1024 * 1024,
        memory_watermark_bytes: 1 << 30,
    }
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        })),
        ImageFormat::Jpeg,
    )
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 200, 30, 255]),
        )),
        ImageFormat::Png,
    )
}

pub fn webp(width: u32, height: u32) -> Vec<u8> {
    let pixels = vec![180u8; (width * height * 3) as usize];
    webp::Encoder::from_rgb(&pixels, width, height)
        .encode(75.0)
        .to_vec()
}

pub fn jpeg_item(name: &str, width: u32, height: u32) -> UploadedItem {
    UploadedItem::from_bytes(name, Some("image/jpeg"), jpeg(width, height))
}

pub fn png_item(name: &str, width: u32, height: u32) -> UploadedItem {
    UploadedItem::from_bytes(name, Some("image/png"), png(width, height))
}

pub fn webp_item(name: &str, width: u32, height: u32) -> UploadedItem {
    UploadedItem::from_bytes(name, Some("image/webp"), webp(width, height))
}

/// Split a payload into `chunk` sized pieces to exercise chunked ingestion.
pub fn chunked_item(name: &str, content_type: &str, data: Vec<u8>, chunk: usize) -> UploadedItem {
    let chunks = data
        .chunks(chunk)
        .map(|c| bytes::Bytes::copy_from_slice(c))
        .collect();
    UploadedItem::from_chunks(name, Some(content_type.to_string()), chunks)
}

/// Page sizes (width, height) of a PDF, in page order.
pub fn page_sizes(pdf: &[u8]) -> Vec<(i64, i64)> {
    let doc = Document::load_mem(pdf).expect("valid pdf");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("page dict");
            let media_box = page
                .get(b"MediaBox")
                .and_then(|o| o.as_array())
                .expect("media box");
            let n: Vec<i64> = media_box.iter().map(|o| o.as_i64().expect("int")).collect();
            assert_eq!((n[0], n[1]), (0, 0), "page origin");
            (n[2], n[3])
        })
        .collect()
}
