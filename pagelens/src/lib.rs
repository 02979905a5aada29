//! Text extraction from scanned images and PDFs.
//!
//! OCR runs either against a hosted OCR.space compatible API or a local
//! Tesseract engine. PDFs are rasterized page by page with poppler. The
//! `processing` helpers split long results into message sized chunks and
//! report simple text statistics.

pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod processing;

pub use config::Config;
pub use error::{PagelensError, Result};
pub use ocr::{Extraction, ImageInput};
