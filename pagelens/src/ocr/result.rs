use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{PagelensError, Result};

/// A decoded bitmap together with the container format it was read from.
///
/// Images built in memory carry no format.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

impl LoadedImage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        let image = reader.decode()?;
        Ok(Self { image, format })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = ImageReader::open(path.as_ref())?.with_guessed_format()?;
        let format = reader.format();
        let image = reader.decode()?;
        Ok(Self { image, format })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl From<DynamicImage> for LoadedImage {
    fn from(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
        }
    }
}

/// What an extractor can be handed: a file on disk, raw encoded bytes, or an
/// already decoded image.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Loaded(LoadedImage),
}

impl ImageInput {
    /// Decode the input, reading it from disk first when needed.
    pub fn load(self) -> Result<LoadedImage> {
        match self {
            ImageInput::Path(path) => LoadedImage::open(path),
            ImageInput::Bytes(bytes) => LoadedImage::from_bytes(&bytes),
            ImageInput::Loaded(loaded) => Ok(loaded),
        }
    }
}

impl From<&str> for ImageInput {
    fn from(path: &str) -> Self {
        ImageInput::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageInput {
    fn from(path: String) -> Self {
        ImageInput::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        ImageInput::Bytes(bytes.to_vec())
    }
}

impl From<LoadedImage> for ImageInput {
    fn from(loaded: LoadedImage) -> Self {
        ImageInput::Loaded(loaded)
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Loaded(image.into())
    }
}

/// Outcome of an extraction.
///
/// `Display` renders the text itself, or `WARNING: ...` / `ERROR: ...` for the
/// other variants, which is the form chat front-ends send back verbatim.
#[derive(Debug)]
pub enum Extraction {
    Text(String),
    Warning(String),
    Failed(PagelensError),
}

pub const NO_TEXT_DETECTED: &str = "No text detected in image";

impl Extraction {
    pub fn no_text() -> Self {
        Extraction::Warning(NO_TEXT_DETECTED.to_string())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Extraction::Text(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Extraction::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PagelensError> {
        match self {
            Extraction::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Collapse into a `Result`, treating a warning as empty text.
    pub fn into_result(self) -> Result<String> {
        match self {
            Extraction::Text(text) => Ok(text),
            Extraction::Warning(_) => Ok(String::new()),
            Extraction::Failed(err) => Err(err),
        }
    }
}

impl From<Result<String>> for Extraction {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => Extraction::Text(text),
            Err(err) => Extraction::Failed(err),
        }
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Text(text) => f.write_str(text),
            Extraction::Warning(reason) => write!(f, "WARNING: {reason}"),
            Extraction::Failed(err) => write!(f, "ERROR: {err}"),
        }
    }
}
