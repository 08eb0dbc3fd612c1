//! Recognizer backends
//!
//! Backends are conditionally compiled based on feature flags. Without one,
//! library callers bring their own [`TextRecognizer`].

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use crate::config::Config;
use crate::engine::{RecognizedWord, TextRecognizer, WordBox};
use crate::error::OcrError;
use std::sync::Arc;

/// TSV level of word rows. Page, block, paragraph and line rows (1-4) carry no text.
const WORD_LEVEL: u8 = 5;

/// Build the recognizer compiled into this binary
pub fn default_recognizer(config: &Config) -> Result<Arc<dyn TextRecognizer>, OcrError> {
    #[cfg(feature = "engine-tesseract")]
    {
        tracing::info!("Initializing tesseract recognizer...");
        let recognizer = tesseract::TesseractRecognizer::new(config)?;
        Ok(Arc::new(recognizer))
    }

    #[cfg(not(feature = "engine-tesseract"))]
    {
        let _ = config;
        Err(OcrError::InitializationError(
            "No OCR engine available. Build with --features engine-tesseract".to_string(),
        ))
    }
}

/// Names of the backends compiled in
pub fn available_engines() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut engines = Vec::new();
    #[cfg(feature = "engine-tesseract")]
    engines.push("tesseract");
    engines
}

/// Parse Tesseract's TSV output into word rows, in reading order.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. A header row and malformed rows are skipped.
/// Fractional confidences are truncated.
pub fn parse_tsv(tsv: &str) -> Vec<RecognizedWord> {
    tsv.lines().filter_map(parse_tsv_row).collect()
}

fn parse_tsv_row(line: &str) -> Option<RecognizedWord> {
    let columns: Vec<&str> = line.splitn(12, '\t').collect();
    if columns.len() < 11 {
        return None;
    }

    let level: u8 = columns[0].trim().parse().ok()?;
    if level != WORD_LEVEL {
        return None;
    }

    let int = |i: usize| columns[i].trim().parse::<i32>().ok();
    let position = WordBox {
        left: int(6)?,
        top: int(7)?,
        width: int(8)?,
        height: int(9)?,
    };
    let confidence = columns[10].trim().parse::<f32>().ok()? as i32;
    let text = columns.get(11).map_or("", |t| t.trim_end_matches(['\r', '\n']));

    Some(RecognizedWord {
        text: text.to_string(),
        confidence,
        position,
    })
}
