#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pagelens::config::OcrConfig;
use pagelens::ocr::TesseractExtractor;

pub use serial_test::serial;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// White grayscale page with a black bar across the middle.
pub fn sample_image(width: u32, height: u32) -> DynamicImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    for y in height / 3..(height / 3 + height / 10).min(height) {
        for x in width / 10..width - width / 10 {
            img.put_pixel(x, y, Luma([0]));
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Encode an image into the given container format.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), format)
        .expect("Failed to encode test image");
    output
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&sample_image(width, height), ImageFormat::Png)
}

/// Write `bytes` into `dir` under `name` and return the full path.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes)
        .unwrap_or_else(|e| panic!("Failed to write fixture '{name}': {e}"));
    path
}

/// A minimal valid PDF with `pages` blank US-letter-ish pages.
///
/// Object offsets are computed while writing so the xref table is exact and
/// poppler does not need to reconstruct it.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages).map(|i| 3 + i).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {pages} >>"),
    ];
    for _ in &page_ids {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] >>".to_string());
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

pub fn pdftoppm_available() -> bool {
    Command::new("pdftoppm")
        .arg("-v")
        .output()
        .map(|output| output.status.success() || !output.stderr.is_empty())
        .unwrap_or(false)
}

/// Local Tesseract with English only, so tests do not need Arabic data.
pub fn english_tesseract() -> TesseractExtractor {
    TesseractExtractor::new(&OcrConfig {
        languages: "eng".to_string(),
        ..OcrConfig::default()
    })
}
