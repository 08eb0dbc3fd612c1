use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use journal_ocr::config::{Config, DEFAULT_MAX_FILE_SIZE};
use journal_ocr::preprocessing::{Pipeline, PreprocessOptions};
use journal_ocr::{cleanup_text, engines, server, ImageSource, OcrOrchestrator};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "journal-ocr")]
#[command(about = "OCR for photographed and scanned handwritten journal pages")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Recognizer selection, shared by every subcommand that runs OCR
#[derive(Args, Debug)]
struct EngineArgs {
    /// Recognition language (e.g., "eng", "deu", "eng+fra")
    #[arg(long, env = "JOURNAL_OCR_LANGUAGE", default_value = "eng", global = true)]
    language: String,

    /// Page segmentation mode (0-13)
    #[arg(long, env = "JOURNAL_OCR_PSM", default_value_t = 6, global = true,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,

    /// OCR engine mode (0-3)
    #[arg(long, env = "JOURNAL_OCR_OEM", global = true,
          value_parser = clap::value_parser!(u8).range(0..=3))]
    oem: Option<u8>,

    /// Path to tessdata directory (downloaded to the user cache if not set)
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    tessdata_path: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from an image
    Process {
        image: PathBuf,

        /// Skip preprocessing and cleanup, print the engine output as is
        #[arg(long)]
        raw: bool,

        #[arg(long)]
        no_preprocess: bool,

        #[arg(long)]
        no_cleanup: bool,

        /// Report mean word confidence and word count
        #[arg(long)]
        confidence: bool,

        /// Print the confidence report as JSON
        #[arg(long, requires = "confidence")]
        json: bool,
    },

    /// Run the preprocessing pipeline and save the result
    Preprocess {
        input: PathBuf,

        /// Output path; the format follows its extension
        output: PathBuf,

        /// Target width; 0 disables resizing
        #[arg(long, allow_negative_numbers = true)]
        resize_width: Option<i64>,

        #[arg(long)]
        no_denoise: bool,

        #[arg(long)]
        no_threshold: bool,

        #[arg(long)]
        no_deskew: bool,

        /// Apply CLAHE after resizing
        #[arg(long)]
        enhance_contrast: bool,
    },

    /// Clean up OCR text from a file, or stdin when no file is given
    Cleanup { file: Option<PathBuf> },

    /// Run the HTTP server
    Serve {
        /// Host address to bind to
        #[arg(long, env = "JOURNAL_OCR_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "JOURNAL_OCR_PORT", default_value = "9393")]
        port: u16,

        /// Maximum upload size in bytes
        #[arg(long, env = "JOURNAL_OCR_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
        max_file_size: usize,
    },
}

impl EngineArgs {
    fn config(&self) -> Config {
        Config {
            language: self.language.clone(),
            page_seg_mode: self.psm,
            engine_mode: self.oem,
            tessdata_path: self.tessdata_path.clone(),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries results, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Process {
            image,
            raw,
            no_preprocess,
            no_cleanup,
            confidence,
            json,
        } => {
            let config = cli.engine.config();
            let recognizer = engines::default_recognizer(&config)?;
            let ocr = OcrOrchestrator::new(recognizer, config.recognition_settings());
            let source = ImageSource::Path(&image);
            let preprocess = !(raw || no_preprocess);

            if confidence {
                let result = ocr.process_image_with_confidence(source, preprocess)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", result.text);
                    println!();
                    println!("Confidence: {:.2}", result.confidence);
                    println!("Words: {}", result.word_count);
                }
            } else {
                let text = ocr.process_image(source, preprocess, !(raw || no_cleanup))?;
                println!("{}", text);
            }
        }

        Command::Preprocess {
            input,
            output,
            resize_width,
            no_denoise,
            no_threshold,
            no_deskew,
            enhance_contrast,
        } => {
            let options = PreprocessOptions {
                resize_width,
                denoise: !no_denoise,
                threshold: !no_threshold,
                deskew: !no_deskew,
                enhance_contrast,
            };
            preprocess_file(&input, &output, options)?;
        }

        Command::Cleanup { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read stdin")?;
                    buffer
                }
            };
            println!("{}", cleanup_text(&raw));
        }

        Command::Serve {
            host,
            port,
            max_file_size,
        } => {
            let config = Config {
                host,
                port,
                max_file_size,
                ..cli.engine.config()
            };

            tracing::info!("Starting journal-ocr v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);

            let recognizer = engines::default_recognizer(&config)?;
            let ocr = OcrOrchestrator::new(recognizer, config.recognition_settings());
            server::run(config, ocr).await?;
        }
    }

    Ok(())
}

fn preprocess_file(input: &Path, output: &Path, options: PreprocessOptions) -> anyhow::Result<()> {
    let image = ImageSource::Path(input).load()?;
    let result = Pipeline::new(options).process(image);

    result
        .image
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    for step in &result.steps {
        println!("{:<10} {:>6}ms", step.name, step.time_ms);
    }
    println!("{:<10} {:>6}ms", "total", result.total_time_ms);
    println!(
        "Saved {}x{} image to {}",
        result.image.width(),
        result.image.height(),
        output.display()
    );

    Ok(())
}
