use crate::config::{DEFAULT_LANGUAGE, DEFAULT_PAGE_SEG_MODE};
use crate::error::OcrError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Language and layout selections handed to the recognizer on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// Language identifier, e.g. "eng" or "eng+osd"
    pub language: String,
    /// Page segmentation mode (0-13)
    pub page_seg_mode: u8,
    /// OCR engine mode (0-3), engine default when unset
    pub engine_mode: Option<u8>,
}

impl RecognitionSettings {
    /// Render the selections as a recognizer config string, e.g. `--psm 6 --oem 3`
    pub fn config_string(&self) -> String {
        match self.engine_mode {
            Some(oem) => format!("--psm {} --oem {}", self.page_seg_mode, oem),
            None => format!("--psm {}", self.page_seg_mode),
        }
    }
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            page_seg_mode: DEFAULT_PAGE_SEG_MODE,
            engine_mode: None,
        }
    }
}

/// Pixel box of a recognized token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// A token reported by the recognizer's word-level mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedWord {
    pub text: String,
    /// 0-100, or -1 when the recognizer has no confidence data for the token
    pub confidence: i32,
    pub position: WordBox,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, confidence: i32) -> Self {
        Self {
            text: text.into(),
            confidence,
            position: WordBox::default(),
        }
    }
}

/// The external OCR capability.
///
/// Implementations must be reentrant or serialize internally; the orchestrator
/// holds no locks around them.
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Recognize the image as one block of text
    fn recognize_text(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<String, OcrError>;

    /// Recognize tokens with per-token confidence, in reading order
    fn recognize_words(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<Vec<RecognizedWord>, OcrError>;
}
