use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::ImageFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagelens::config::Config;
use pagelens::ocr::{
    enhance_for_ocr, Extraction, ImageInput, ImageValidator, LoadedImage, RemoteOcrExtractor,
    TesseractExtractor,
};
use pagelens::pdf::PdfExtractor;
use pagelens::processing::{text_statistics, MessageSplitter};

#[derive(Parser)]
#[command(name = "pagelens", version)]
#[command(about = "Extract text from scanned images and PDFs")]
#[command(after_help = "Settings are read from the environment or a `.env` file \
    (OCR_API_KEY, OCR_LANGUAGES, OCR_DPI, MAX_MESSAGE_LENGTH, ...).")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR a single image
    Image {
        path: PathBuf,
        /// Use the hosted OCR API instead of local Tesseract
        #[arg(long)]
        remote: bool,
        /// Sharpen, boost contrast and convert to grayscale first
        #[arg(long)]
        enhance: bool,
        /// Reject images over the size limits or in unsupported formats
        #[arg(long)]
        validate: bool,
    },
    /// OCR every page of a PDF
    Pdf {
        path: PathBuf,
        /// Print a status line for each page before the text
        #[arg(long)]
        pages: bool,
    },
    /// Detect whether the file is a PDF or an image and OCR it
    Extract { path: PathBuf },
    /// Check an image against the configured limits
    Validate { path: PathBuf },
    /// Print line, word and character counts as JSON
    Stats { path: PathBuf },
    /// Split a text file into message sized chunks
    Split {
        path: PathBuf,
        #[arg(long)]
        max_length: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagelens=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    match args.command {
        Command::Image {
            path,
            remote,
            enhance,
            validate,
        } => run_image(&config, &path, remote, enhance, validate).await,
        Command::Pdf { path, pages } => run_pdf(&config, &path, pages).await,
        Command::Extract { path } => run_extract(&config, &path).await,
        Command::Validate { path } => {
            let (ok, message) = ImageValidator::new(config.limits).validate(path.as_path());
            println!("{message}");
            Ok(exit_code(ok))
        }
        Command::Stats { path } => {
            let text = read_text(&path).await?;
            println!("{}", serde_json::to_string_pretty(&text_statistics(&text))?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Split { path, max_length } => {
            let text = read_text(&path).await?;
            let splitter = match max_length {
                Some(max_message_length) => MessageSplitter::new(&pagelens::config::MessageConfig {
                    max_message_length,
                }),
                None => MessageSplitter::new(&config.messages),
            };

            let chunks = splitter.split(&text);
            let total = chunks.len();
            for (i, chunk) in chunks.iter().enumerate() {
                println!("----- {}/{total} -----", i + 1);
                println!("{chunk}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_image(
    config: &Config,
    path: &Path,
    remote: bool,
    enhance: bool,
    validate: bool,
) -> anyhow::Result<ExitCode> {
    if validate {
        let (ok, message) = ImageValidator::new(config.limits).validate(path);
        if !ok {
            println!("ERROR: {message}");
            return Ok(ExitCode::FAILURE);
        }
    }

    let input = if enhance {
        let loaded = LoadedImage::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        let enhanced = enhance_for_ocr(loaded.image);

        // Re-encode so the hosted API can accept the enhanced image too.
        let mut png = Vec::new();
        enhanced.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        ImageInput::Bytes(png)
    } else {
        ImageInput::from(path)
    };

    let result = if remote {
        let api = RemoteOcrExtractor::new(&config.ocr)?;
        api.extract(input).await
    } else {
        let ocr = TesseractExtractor::new(&config.ocr);
        if !ocr.is_available() {
            tracing::warn!("Local OCR unavailable, try --remote");
        }
        ocr.extract(input, None).await
    };

    Ok(report(result))
}

async fn run_pdf(config: &Config, path: &Path, pages: bool) -> anyhow::Result<ExitCode> {
    let pdf = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let extractor = PdfExtractor::new(&config.pdf, TesseractExtractor::new(&config.ocr));

    if !pages {
        return Ok(report(extractor.extract(&pdf).await));
    }

    match extractor.extract_pages(&pdf).await {
        Ok(document) => {
            for page in &document.pages {
                let status = match &page.result {
                    Extraction::Text(_) => "ok",
                    Extraction::Warning(_) => "warning",
                    Extraction::Failed(_) => "failed",
                };
                eprintln!("page {}: {status}", page.page_number);
            }
            println!("{}", document.render());
            Ok(exit_code(document.is_complete()))
        }
        Err(e) => Ok(report(Extraction::Failed(e))),
    }
}

async fn run_extract(config: &Config, path: &Path) -> anyhow::Result<ExitCode> {
    let kind = infer::get_from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .with_context(|| format!("Unknown file type: {}", path.display()))?;

    match (kind.mime_type(), kind.matcher_type()) {
        ("application/pdf", _) => run_pdf(config, path, false).await,
        (_, infer::MatcherType::Image) => run_image(config, path, false, false, true).await,
        (mime, _) => anyhow::bail!("Unsupported file type {mime} for {}", path.display()),
    }
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn report(result: Extraction) -> ExitCode {
    println!("{result}");
    exit_code(!result.is_failed())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
