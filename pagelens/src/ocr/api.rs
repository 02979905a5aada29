use std::time::Duration;

use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::result::{Extraction, ImageInput};
use crate::config::OcrConfig;
use crate::error::{PagelensError, Result};

const PARSE_IMAGE_PATH: &str = "/parse/image";

/// The hosted API only looks at the bytes, so every upload is labelled JPEG.
const UPLOAD_FILE_NAME: &str = "image.jpg";
const UPLOAD_MIME_TYPE: &str = "image/jpeg";
const OCR_ENGINE: &str = "2";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseImageResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

/// `ErrorMessage` comes back either as a list or as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    Many(Vec<String>),
    One(String),
}

impl ErrorMessage {
    fn first(&self) -> Option<&str> {
        match self {
            ErrorMessage::Many(messages) => messages.first().map(String::as_str),
            ErrorMessage::One(message) => Some(message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

impl ParseImageResponse {
    fn into_extraction(self) -> Extraction {
        if self.is_errored_on_processing {
            let message = self
                .error_message
                .as_ref()
                .and_then(ErrorMessage::first)
                .unwrap_or("Unknown error")
                .to_string();
            return Extraction::Failed(PagelensError::OcrProcessing(message));
        }

        let text = self
            .parsed_results
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|result| result.parsed_text)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            Extraction::no_text()
        } else {
            Extraction::Text(text)
        }
    }
}

/// Client for an OCR.space compatible `parse/image` endpoint.
#[derive(Clone, Debug)]
pub struct RemoteOcrExtractor {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl RemoteOcrExtractor {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PagelensError::Config("API key required for remote OCR".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.api_language.clone(),
        })
    }

    /// Send an image to the hosted API and return the first parsed result.
    ///
    /// Decoded images are rejected up front: the API needs the encoded bytes.
    #[instrument(skip_all)]
    pub async fn extract(&self, input: impl Into<ImageInput>) -> Extraction {
        let bytes = match input.into() {
            ImageInput::Path(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => return Self::unexpected(e.into()),
            },
            ImageInput::Bytes(bytes) => bytes,
            ImageInput::Loaded(_) => return Extraction::Failed(PagelensError::InvalidImageData),
        };

        match self.parse_image(bytes).await {
            Ok(extraction) => extraction,
            Err(e @ (PagelensError::Timeout | PagelensError::ServerStatus(_))) => {
                Extraction::Failed(e)
            }
            Err(e) => Self::unexpected(e),
        }
    }

    fn unexpected(e: PagelensError) -> Extraction {
        error!("OCR API error: {e}");
        Extraction::Failed(e)
    }

    async fn parse_image(&self, bytes: Vec<u8>) -> Result<Extraction> {
        let file_part = multipart::Part::bytes(bytes)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME_TYPE)?;

        let form = multipart::Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", self.language.clone())
            .text("isOverlayRequired", "false")
            .text("detectOrientation", "true")
            .text("scale", "true")
            .text("OCREngine", OCR_ENGINE)
            .part("file", file_part);

        let url = format!("{}{PARSE_IMAGE_PATH}", self.base_url);
        debug!("Sending OCR request to {}", url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        debug!("OCR response status: {}", status);

        if !status.is_success() {
            return Err(PagelensError::ServerStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        let parsed: ParseImageResponse = serde_json::from_slice(&body)?;

        Ok(parsed.into_extraction())
    }
}

fn map_transport_error(e: reqwest::Error) -> PagelensError {
    if e.is_timeout() {
        PagelensError::Timeout
    } else {
        PagelensError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn test_config(base_url: &str) -> OcrConfig {
        OcrConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            api_language: "ara".to_string(),
            languages: "eng".to_string(),
            engine_config: String::new(),
            timeout_secs: 5,
        }
    }

    async fn mock_response(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/parse/image"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = test_config("http://localhost");
        config.api_key = None;

        let result = RemoteOcrExtractor::new(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key required"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RemoteOcrExtractor::new(&test_config("https://api.example.com/")).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[tokio::test]
    async fn test_successful_extraction_is_trimmed() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": false,
                "ParsedResults": [{ "ParsedText": "  مرحبا\r\nworld  \n" }]
            })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"fake image bytes".as_slice()).await;

        assert_eq!(result.text(), Some("مرحبا\r\nworld"));
    }

    #[tokio::test]
    async fn test_multipart_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse/image"))
            .and(body_string_contains("name=\"apikey\""))
            .and(body_string_contains("test-key"))
            .and(body_string_contains("name=\"language\""))
            .and(body_string_contains("name=\"OCREngine\""))
            .and(body_string_contains("name=\"detectOrientation\""))
            .and(body_string_contains("filename=\"image.jpg\""))
            .and(body_string_contains("image/jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": false,
                "ParsedResults": [{ "ParsedText": "ok" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"fake png bytes".to_vec()).await;

        assert_eq!(result.to_string(), "ok");
    }

    #[tokio::test]
    async fn test_provider_error_message() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": true,
                "ErrorMessage": ["bad scan"]
            })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(result.to_string(), "ERROR: OCR processing failed: bad scan");
        assert!(matches!(
            result.error(),
            Some(PagelensError::OcrProcessing(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_as_plain_string() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": true,
                "ErrorMessage": "quota exceeded"
            })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(
            result.to_string(),
            "ERROR: OCR processing failed: quota exceeded"
        );
    }

    #[tokio::test]
    async fn test_provider_error_without_message() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "IsErroredOnProcessing": true })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(
            result.to_string(),
            "ERROR: OCR processing failed: Unknown error"
        );
    }

    #[tokio::test]
    async fn test_no_parsed_results_is_warning() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": false,
                "ParsedResults": []
            })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(result.to_string(), "WARNING: No text detected in image");
    }

    #[tokio::test]
    async fn test_blank_text_is_warning() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "IsErroredOnProcessing": false,
                "ParsedResults": [{ "ParsedText": " \r\n " }]
            })),
        )
        .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert!(matches!(result, Extraction::Warning(_)));
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let server = MockServer::start().await;
        mock_response(&server, ResponseTemplate::new(503)).await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(result.to_string(), "ERROR: Server connection failed (503)");
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        mock_response(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ParsedResults": [{ "ParsedText": "late" }] }))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let mut config = test_config(&server.uri());
        config.timeout_secs = 1;

        let client = RemoteOcrExtractor::new(&config).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert_eq!(result.to_string(), "ERROR: OCR API request timed out");
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let server = MockServer::start().await;
        mock_response(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(b"img".as_slice()).await;

        assert!(matches!(result.error(), Some(PagelensError::Json(_))));
        assert!(result.to_string().starts_with("ERROR: "));
    }

    #[tokio::test]
    async fn test_decoded_image_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(DynamicImage::new_rgb8(10, 10)).await;

        assert_eq!(result.to_string(), "ERROR: Invalid image data type");
    }

    #[tokio::test]
    async fn test_reads_image_from_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse/image"))
            .and(body_string_contains("bytes from disk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ParsedResults": [{ "ParsedText": "from disk" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.jpg");
        std::fs::write(&file, b"bytes from disk").unwrap();

        let client = RemoteOcrExtractor::new(&test_config(&server.uri())).unwrap();
        let result = client.extract(file).await;

        assert_eq!(result.text(), Some("from disk"));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let client = RemoteOcrExtractor::new(&test_config("http://127.0.0.1:9")).unwrap();
        let result = client.extract("/no/such/scan.jpg").await;

        assert!(matches!(result.error(), Some(PagelensError::Io(_))));
    }
}
