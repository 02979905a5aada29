//! OCR (Optical Character Recognition) Module
//!
//! Text extraction from single images, either through a hosted OCR API or a
//! local Tesseract engine, plus the image checks that usually run before it.
//!
//! # Architecture
//!
//! - `RemoteOcrExtractor` uploads encoded bytes to an OCR.space compatible API
//! - `TesseractExtractor` runs Tesseract in-process via leptess
//! - `validate_image` / `enhance_for_ocr` inspect and prepare images
//!
//! Extractors never return `Err`: every outcome, including failures, is an
//! [`Extraction`]. Its `Display` gives the plain text, or a `WARNING: ` /
//! `ERROR: ` prefixed message.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = TesseractExtractor::new(&config.ocr);
//! let page = ocr.extract(image_bytes, Some(1)).await;
//! println!("{page}");
//! ```

mod api;
mod preprocessing;
mod provider;
mod result;

pub use api::RemoteOcrExtractor;
pub use preprocessing::{
    enhance_for_ocr, validate_image, ImageValidator, SIZE_EXCEEDED, SUPPORTED_FORMATS,
    UNSUPPORTED_FORMAT, VALIDATION_OK,
};
pub use provider::{banner, page_header, EngineOptions, TesseractExtractor, BANNER_WIDTH};
pub use result::{Extraction, ImageInput, LoadedImage, NO_TEXT_DETECTED};
