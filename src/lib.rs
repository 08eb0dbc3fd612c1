//! Image conditioning and text cleanup around an external OCR engine, tuned
//! for photographed or scanned handwritten journal pages.
//!
//! ```no_run
//! use journal_ocr::{engines, Config, ImageSource, OcrOrchestrator};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), journal_ocr::OcrError> {
//! let config = Config::default();
//! let recognizer = engines::default_recognizer(&config)?;
//! let ocr = OcrOrchestrator::new(recognizer, config.recognition_settings());
//! let text = ocr.process_image(ImageSource::Path(Path::new("page-01.jpg")), true, true)?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod image_io;
pub mod ocr;
pub mod preprocessing;
pub mod server;
pub mod text;

pub use config::Config;
pub use engine::{RecognitionSettings, RecognizedWord, TextRecognizer};
pub use error::OcrError;
pub use image_io::ImageSource;
pub use ocr::{aggregate_words, OcrOrchestrator, RecognitionResult};
pub use preprocessing::{preprocess, PreprocessOptions};
pub use text::cleanup_text;
