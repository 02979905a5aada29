use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagelensError {
    #[error("Invalid image data type")]
    InvalidImageData,

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Server connection failed ({0})")]
    ServerStatus(u16),

    #[error("OCR API request timed out")]
    Timeout,

    #[error("Image processing failed: {0}")]
    ImageProcessing(#[source] Box<PagelensError>),

    #[error("PDF processing failed: {0}")]
    PdfProcessing(#[source] Box<PagelensError>),

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("{0}")]
    Rasterize(String),

    #[error("{0}")]
    Tesseract(String),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PagelensError {
    /// Wrap a local failure as an image processing error, keeping the cause.
    pub fn image_processing(cause: impl Into<PagelensError>) -> Self {
        PagelensError::ImageProcessing(Box::new(cause.into()))
    }

    /// Wrap a document-level failure as a PDF processing error, keeping the cause.
    pub fn pdf_processing(cause: impl Into<PagelensError>) -> Self {
        PagelensError::PdfProcessing(Box::new(cause.into()))
    }
}

pub type Result<T> = std::result::Result<T, PagelensError>;
