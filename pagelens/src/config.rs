use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        Ok(_) => {
            tracing::warn!("Empty value for {}. Ignoring.", var);
            None
        }
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
    pub pdf: PdfConfig,
    pub limits: ImageLimits,
    pub messages: MessageConfig,
}

/// Settings shared by the remote and local OCR extractors.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Key for the hosted OCR API. The remote extractor refuses to start without one.
    pub api_key: Option<String>,
    /// Base URL of the hosted OCR API; requests go to `{base_url}/parse/image`.
    pub base_url: String,
    /// Language code sent to the hosted API (a single code, e.g. `ara`).
    pub api_language: String,
    /// Tesseract language set, `+` separated (e.g. `ara+eng`).
    pub languages: String,
    /// Tesseract engine options in command-line form (e.g. `--oem 3 --psm 6`).
    pub engine_config: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    pub dpi: u32,
    pub pdftoppm_path: String,
}

/// Maximum accepted image dimensions, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageLimits {
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    pub max_message_length: usize,
}

pub const DEFAULT_OCR_API_URL: &str = "https://api.ocr.space";
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OCR_API_URL.to_string(),
            api_language: "ara".to_string(),
            languages: "ara+eng".to_string(),
            engine_config: "--oem 3 --psm 6".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            pdftoppm_path: "pdftoppm".to_string(),
        }
    }
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr = OcrConfig::default();
        let pdf = PdfConfig::default();
        let limits = ImageLimits::default();
        let messages = MessageConfig::default();

        Self {
            ocr: OcrConfig {
                api_key: parse_env_opt("OCR_API_KEY"),
                base_url: env::var("OCR_API_URL").unwrap_or(ocr.base_url),
                api_language: env::var("OCR_API_LANGUAGE").unwrap_or(ocr.api_language),
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr.languages),
                engine_config: env::var("OCR_CONFIG").unwrap_or(ocr.engine_config),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr.timeout_secs),
            },
            pdf: PdfConfig {
                dpi: parse_env_or("OCR_DPI", pdf.dpi),
                pdftoppm_path: env::var("PDFTOPPM_PATH").unwrap_or(pdf.pdftoppm_path),
            },
            limits: ImageLimits {
                max_width: parse_env_or("MAX_IMAGE_WIDTH", limits.max_width),
                max_height: parse_env_or("MAX_IMAGE_HEIGHT", limits.max_height),
            },
            messages: MessageConfig {
                max_message_length: parse_env_or(
                    "MAX_MESSAGE_LENGTH",
                    messages.max_message_length,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
