use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::PdfConfig;
use crate::error::{PagelensError, Result};

const INPUT_FILE: &str = "input.pdf";
const PAGE_PREFIX: &str = "page";

/// PNG renderings of every page of one document.
///
/// The files live in a temporary directory that is removed on drop.
#[derive(Debug)]
pub struct RasterizedPages {
    _dir: TempDir,
    pages: Vec<PathBuf>,
}

impl RasterizedPages {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page images in page order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.pages
    }
}

/// Renders PDF pages to PNG with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: String,
    dpi: u32,
}

impl Rasterizer {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            program: config.pdftoppm_path.clone(),
            dpi: config.dpi,
        }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    #[instrument(level = "debug", skip_all, fields(bytes = pdf.len(), dpi = self.dpi))]
    pub async fn rasterize(&self, pdf: &[u8]) -> Result<RasterizedPages> {
        let dir = tempfile::Builder::new().prefix("pagelens").tempdir()?;
        let input = dir.path().join(INPUT_FILE);
        tokio::fs::write(&input, pdf).await?;

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(dir.path().join(PAGE_PREFIX))
            .output()
            .await
            .map_err(|e| {
                PagelensError::Rasterize(format!("failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PagelensError::Rasterize(format!(
                "{} failed ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let pages = collect_pages(dir.path())?;
        debug!(pages = pages.len(), "Rasterized PDF");

        Ok(RasterizedPages { _dir: dir, pages })
    }
}

/// List `page-N.png` files in `dir`, ordered by `N`.
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = dir
        .read_dir()?
        .map(|entry| Ok(entry?.path()))
        .collect::<Result<Vec<PathBuf>>>()?
        .into_iter()
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect::<Vec<_>>();

    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// `pdftoppm` names pages `<prefix>-<n>.png`, zero padding `n` to the width
/// of the largest page number.
fn page_number(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != PAGE_PREFIX {
        return None;
    }
    number.parse().ok()
}
