//! Process-wide tuning constants and the runtime configuration built at startup.
//!
//! The constants are baked into the pipeline. Only recognizer selection
//! (language, page segmentation, engine mode) and the server surface are
//! configurable, and only once per process.

use crate::engine::RecognitionSettings;

/// Target width for the maintain-aspect resize when the caller sets none
pub const DEFAULT_RESIZE_WIDTH: u32 = 1800;

/// Global cutoff used to build the foreground mask for skew detection
pub const DESKEW_THRESHOLD: u8 = 150;

/// Recognizer language when none is configured
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Tesseract page segmentation mode 6: a single uniform block of text
pub const DEFAULT_PAGE_SEG_MODE: u8 = 6;

/// Upload limit for the HTTP surface (50MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub language: String,
    pub page_seg_mode: u8,
    pub engine_mode: Option<u8>,
    pub tessdata_path: Option<String>,
}

impl Config {
    pub fn recognition_settings(&self) -> RecognitionSettings {
        RecognitionSettings {
            language: self.language.clone(),
            page_seg_mode: self.page_seg_mode,
            engine_mode: self.engine_mode,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            language: DEFAULT_LANGUAGE.to_string(),
            page_seg_mode: DEFAULT_PAGE_SEG_MODE,
            engine_mode: None,
            tessdata_path: None,
        }
    }
}
