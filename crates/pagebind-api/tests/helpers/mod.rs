//! Shared setup for HTTP tests: an in-process server and image fixtures.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum_test::multipart::Part;
use axum_test::TestServer;
use image::{DynamicImage, ImageFormat, RgbImage};
use pagebind_api::setup::routes::setup_routes;
use pagebind_api::AppState;
use pagebind_core::{Config, ResourceLimits};

pub fn test_config() -> Config {
    Config {
        limits: ResourceLimits {
            max_item_count: 4,
            max_item_size_bytes: 512 * 1024,
            max_total_size_bytes: 1024 * 1024,
            memory_watermark_bytes: 1 << 30,
        },
        ..Config::default()
    }
}

pub fn setup_test_server() -> TestServer {
    setup_test_server_with(test_config())
}

pub fn setup_test_server_with(config: Config) -> TestServer {
    let state = Arc::new(AppState::new(config.clone(), None));
    let app = setup_routes(&config, state).expect("Failed to build router");
    TestServer::new(app.into_make_service()).expect("Failed to create test server")
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))),
        ImageFormat::Jpeg,
    )
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([40, 200, 40]))),
        ImageFormat::Png,
    )
}

pub fn webp(width: u32, height: u32) -> Vec<u8> {
    let pixels = vec![90u8; (width * height * 4) as usize];
    webp::Encoder::from_rgba(&pixels, width, height)
        .encode_lossless()
        .to_vec()
}

pub fn image_part(data: Vec<u8>, file_name: &str, mime_type: &str) -> Part {
    Part::bytes(data).file_name(file_name).mime_type(mime_type)
}

/// Page sizes (width, height) of a PDF, in page order.
pub fn page_sizes(pdf: &[u8]) -> Vec<(i64, i64)> {
    let doc = lopdf::Document::load_mem(pdf).expect("valid pdf");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("page dict");
            let media_box = page
                .get(b"MediaBox")
                .and_then(|o| o.as_array())
                .expect("media box");
            (
                media_box[2].as_i64().expect("width"),
                media_box[3].as_i64().expect("height"),
            )
        })
        .collect()
}
