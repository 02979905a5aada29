//! PDF text extraction.
//!
//! Each page is rendered to PNG with `pdftoppm` and run through the local
//! Tesseract extractor, one page at a time. The rendered document keeps the
//! layout chat clients already expect:
//!
//! ```text
//! Total Pages: 2
//! ==================================================
//!
//! <page 1 header and text>
//!
//!
//! ==================================================
//!
//!
//! <page 2 header and text>
//! ```

mod rasterize;

use std::io::Read;

use tracing::{error, info, instrument, warn};

use crate::config::PdfConfig;
use crate::error::{PagelensError, Result};
use crate::ocr::{banner, Extraction, TesseractExtractor};

pub use rasterize::{RasterizedPages, Rasterizer};

/// Outcome for a single page, numbered from 1.
#[derive(Debug)]
pub struct PageExtraction {
    pub page_number: usize,
    pub result: Extraction,
}

/// Per-page outcomes for a whole document.
#[derive(Debug, Default)]
pub struct PdfExtraction {
    pub pages: Vec<PageExtraction>,
}

impl PdfExtraction {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// True when no page failed. Pages with a warning still count as complete.
    pub fn is_complete(&self) -> bool {
        self.pages.iter().all(|page| !page.result.is_failed())
    }

    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|page| page.result.is_failed())
            .map(|page| page.page_number)
            .collect()
    }

    /// Render the document string, embedding any per-page `ERROR:` text in
    /// place of that page's content.
    pub fn render(&self) -> String {
        let banner = banner();
        let separator = format!("\n\n{banner}\n\n");
        let last = self.pages.len().saturating_sub(1);

        let mut parts = Vec::with_capacity(self.pages.len() * 2);
        for (i, page) in self.pages.iter().enumerate() {
            parts.push(page.result.to_string());
            if i < last {
                parts.push(separator.clone());
            }
        }

        format!(
            "Total Pages: {}\n{banner}\n\n{}",
            self.total_pages(),
            parts.join("\n")
        )
    }
}

/// OCR over every page of a PDF.
#[derive(Clone)]
pub struct PdfExtractor {
    rasterizer: Rasterizer,
    ocr: TesseractExtractor,
}

impl PdfExtractor {
    pub fn new(config: &PdfConfig, ocr: TesseractExtractor) -> Self {
        Self {
            rasterizer: Rasterizer::new(config),
            ocr,
        }
    }

    /// Extract the whole document as a single string.
    ///
    /// Only a rasterization failure fails the document. A page that fails
    /// OCR shows up as its `ERROR:` line inside the text.
    pub async fn extract(&self, pdf: &[u8]) -> Extraction {
        match self.extract_pages(pdf).await {
            Ok(document) => Extraction::Text(document.render()),
            Err(e) => Extraction::Failed(e),
        }
    }

    /// Read `reader` to the end, then extract it like [`PdfExtractor::extract`].
    pub async fn extract_reader(&self, mut reader: impl Read) -> Extraction {
        let mut pdf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut pdf) {
            error!("PDF OCR error: {e}");
            return Extraction::Failed(PagelensError::pdf_processing(e));
        }
        self.extract(&pdf).await
    }

    /// Extract every page and keep the individual outcomes.
    #[instrument(skip_all, fields(bytes = pdf.len()))]
    pub async fn extract_pages(&self, pdf: &[u8]) -> Result<PdfExtraction> {
        let rendered = self.rasterizer.rasterize(pdf).await.map_err(|e| {
            error!("PDF OCR error: {e}");
            PagelensError::pdf_processing(e)
        })?;
        info!(pages = rendered.len(), dpi = self.rasterizer.dpi(), "Running OCR on PDF");

        let mut document = PdfExtraction::default();
        for (i, path) in rendered.paths().iter().enumerate() {
            let page_number = i + 1;
            let result = self.ocr.extract(path.as_path(), Some(page_number)).await;
            if result.is_failed() {
                warn!(page = page_number, "Page OCR failed: {result}");
            }
            document.pages.push(PageExtraction {
                page_number,
                result,
            });
        }

        Ok(document)
    }
}
