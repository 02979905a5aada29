use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::result::{Extraction, ImageInput};
use crate::config::OcrConfig;
use crate::error::{PagelensError, Result};

pub const BANNER_WIDTH: usize = 50;

/// Banner line used around page headers and between PDF pages.
pub fn banner() -> String {
    "=".repeat(BANNER_WIDTH)
}

/// `=====\nPage <n>\n=====\n\n`
pub fn page_header(page_number: usize) -> String {
    let banner = banner();
    format!("{banner}\nPage {page_number}\n{banner}\n\n")
}

/// Tesseract options recognised in the command-line style config string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub page_seg_mode: Option<String>,
    pub dpi: Option<i32>,
}

impl EngineOptions {
    /// Parse `--psm N` and `--dpi N`. `--oem` picks the engine at init time,
    /// which the library binding does not expose, so it is skipped like any
    /// other unknown flag.
    pub fn parse(config: &str) -> Self {
        let mut options = Self::default();
        let mut tokens = config.split_whitespace();

        while let Some(token) = tokens.next() {
            match token {
                "--psm" => options.page_seg_mode = tokens.next().map(str::to_string),
                "--dpi" => options.dpi = tokens.next().and_then(|v| v.parse().ok()),
                other => debug!(flag = other, "Ignoring unsupported tesseract option"),
            }
        }

        options
    }
}

#[derive(Clone)]
enum TesseractBackend {
    Local {
        tesseract: Arc<Mutex<LepTess>>,
        dpi: Option<i32>,
    },
    Unavailable {
        reason: String,
    },
}

/// Local OCR over a single image using Tesseract.
#[derive(Clone)]
pub struct TesseractExtractor {
    backend: TesseractBackend,
}

fn create_tesseract(languages: &str, options: &EngineOptions) -> std::result::Result<LepTess, String> {
    let mut lt = LepTess::new(None, languages).map_err(|e| e.to_string())?;
    if let Some(psm) = &options.page_seg_mode {
        lt.set_variable(Variable::TesseditPagesegMode, psm)
            .map_err(|e| format!("invalid page segmentation mode {psm}: {e:?}"))?;
    }
    Ok(lt)
}

impl TesseractExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        let options = EngineOptions::parse(&config.engine_config);

        let backend = match create_tesseract(&config.languages, &options) {
            Ok(lt) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                TesseractBackend::Local {
                    tesseract: Arc::new(Mutex::new(lt)),
                    dpi: options.dpi,
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                TesseractBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, TesseractBackend::Unavailable { .. })
    }

    /// Run OCR over one image, prefixing a page header when `page_number` is set.
    #[instrument(skip_all, fields(page = ?page_number))]
    pub async fn extract(
        &self,
        input: impl Into<ImageInput>,
        page_number: Option<usize>,
    ) -> Extraction {
        let (tesseract, dpi) = match &self.backend {
            TesseractBackend::Local { tesseract, dpi } => (Arc::clone(tesseract), *dpi),
            TesseractBackend::Unavailable { reason } => {
                return Extraction::Failed(PagelensError::OcrUnavailable(reason.clone()));
            }
        };

        let input = input.into();
        let result = tokio::task::spawn_blocking(move || {
            let png = encode_rgb_png(input)?;
            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&png)
                .map_err(|e| PagelensError::Tesseract(format!("Failed to set image: {e}")))?;
            if let Some(dpi) = dpi {
                lt.set_source_resolution(dpi);
            }
            lt.get_utf8_text()
                .map_err(|e| PagelensError::Tesseract(format!("Failed to extract text: {e}")))
        })
        .await
        .unwrap_or_else(|e| Err(PagelensError::Tesseract(format!("OCR task panicked: {e}"))));

        match result {
            Ok(text) => {
                let text = text.trim();
                match page_number {
                    Some(n) => Extraction::Text(format!("{}{text}", page_header(n))),
                    None => Extraction::Text(text.to_string()),
                }
            }
            Err(e) => {
                error!("Tesseract OCR error: {e}");
                Extraction::Failed(PagelensError::image_processing(e))
            }
        }
    }
}

/// Decode the input, drop any alpha or palette, and re-encode as 8-bit RGB PNG
/// for leptonica.
fn encode_rgb_png(input: ImageInput) -> Result<Vec<u8>> {
    let loaded = input.load()?;
    let rgb = DynamicImage::ImageRgb8(loaded.image.to_rgb8());

    let mut output = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
