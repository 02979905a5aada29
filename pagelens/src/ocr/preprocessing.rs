use std::io::{BufRead, Cursor, Seek};

use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::{debug, error};

use super::result::ImageInput;
use crate::config::ImageLimits;
use crate::error::{PagelensError, Result};

/// Container formats accepted for OCR uploads.
pub const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

pub const VALIDATION_OK: &str = "OK";
pub const SIZE_EXCEEDED: &str = "Image size exceeds allowed limits";
pub const UNSUPPORTED_FORMAT: &str = "Unsupported image format";

pub const SHARPNESS_FACTOR: f32 = 2.0;
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Checks uploads against configured dimension limits and the format allow-list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageValidator {
    limits: ImageLimits,
}

impl ImageValidator {
    pub fn new(limits: ImageLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, input: impl Into<ImageInput>) -> (bool, String) {
        validate_image(input, &self.limits)
    }
}

/// Validate image size and format.
///
/// Returns `(true, "OK")` when the image fits the limits and its format is
/// one of [`SUPPORTED_FORMATS`]. Size is checked before format. A decode
/// failure is reported with the decoder's own message.
pub fn validate_image(input: impl Into<ImageInput>, limits: &ImageLimits) -> (bool, String) {
    let (width, height, format) = match inspect(input.into()) {
        Ok(info) => info,
        Err(e) => {
            debug!("Image rejected, could not be read: {e}");
            return (false, e.to_string());
        }
    };

    if width > limits.max_width || height > limits.max_height {
        debug!(
            width,
            height,
            max_width = limits.max_width,
            max_height = limits.max_height,
            "Image rejected, too large"
        );
        return (false, SIZE_EXCEEDED.to_string());
    }

    if !format.is_some_and(|f| SUPPORTED_FORMATS.contains(&f)) {
        debug!(?format, "Image rejected, unsupported format");
        return (false, UNSUPPORTED_FORMAT.to_string());
    }

    (true, VALIDATION_OK.to_string())
}

/// Read dimensions and format. Encoded inputs only have their header parsed.
fn inspect(input: ImageInput) -> Result<(u32, u32, Option<ImageFormat>)> {
    match input {
        ImageInput::Path(path) => header_info(ImageReader::open(path)?),
        ImageInput::Bytes(bytes) => header_info(ImageReader::new(Cursor::new(bytes))),
        ImageInput::Loaded(loaded) => Ok((loaded.width(), loaded.height(), loaded.format)),
    }
}

fn header_info<R: BufRead + Seek>(
    reader: ImageReader<R>,
) -> Result<(u32, u32, Option<ImageFormat>)> {
    let reader = reader.with_guessed_format()?;
    let format = reader.format();
    let (width, height) = reader.into_dimensions()?;
    Ok((width, height, format))
}

/// Enhance an image for OCR: sharpen, boost contrast, convert to grayscale.
///
/// Enhancement is best effort. If anything goes wrong the original image is
/// returned untouched.
pub fn enhance_for_ocr(image: DynamicImage) -> DynamicImage {
    match try_enhance(&image) {
        Ok(enhanced) => enhanced,
        Err(e) => {
            error!("Image enhancement error: {e}");
            image
        }
    }
}

fn try_enhance(image: &DynamicImage) -> Result<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(PagelensError::EmptyImage { width, height });
    }

    let rgb = match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => other.to_rgb8(),
    };

    let sharpened = sharpen(&rgb, SHARPNESS_FACTOR);
    let contrasted = adjust_contrast(&sharpened, CONTRAST_FACTOR);

    Ok(DynamicImage::ImageRgb8(contrasted).grayscale())
}

/// Interpolate between `degenerate` and `original`; factors above 1.0
/// extrapolate away from the degenerate value.
fn blend(degenerate: f32, original: f32, factor: f32) -> u8 {
    (degenerate + factor * (original - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Sharpen by extrapolating away from a smoothed copy.
///
/// The smoothing kernel is `[1 1 1; 1 5 1; 1 1 1] / 13`. Border pixels have
/// no full neighbourhood and are kept as-is.
fn sharpen(rgb: &RgbImage, factor: f32) -> RgbImage {
    let (width, height) = rgb.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let pixel = *rgb.get_pixel(x, y);
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            return pixel;
        }

        let mut out = [0u8; 3];
        for (channel, value) in out.iter_mut().enumerate() {
            let mut acc = 0u32;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let weight = if nx == x && ny == y { 5 } else { 1 };
                    acc += weight * u32::from(rgb.get_pixel(nx, ny)[channel]);
                }
            }
            let smoothed = acc as f32 / 13.0;
            *value = blend(smoothed, f32::from(pixel[channel]), factor);
        }
        Rgb(out)
    })
}

/// Stretch every channel away from the mean luminance of the image.
fn adjust_contrast(rgb: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(rgb);
    let mut out = rgb.clone();
    for pixel in out.pixels_mut() {
        for value in pixel.0.iter_mut() {
            *value = blend(mean, f32::from(*value), factor);
        }
    }
    out
}

/// Mean ITU-R 601-2 luma, rounded to a whole gray level.
fn mean_luma(rgb: &RgbImage) -> f32 {
    let pixel_count = u64::from(rgb.width()) * u64::from(rgb.height());
    if pixel_count == 0 {
        return 0.0;
    }

    let total: f64 = rgb
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0
        })
        .sum();

    (total / pixel_count as f64).round() as f32
}
