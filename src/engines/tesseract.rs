//! Tesseract recognizer
//!
//! Uses tesseract-static for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use unless a
//! tessdata directory is configured.

use super::parse_tsv;
use crate::config::Config;
use crate::engine::{RecognitionSettings, RecognizedWord, TextRecognizer};
use crate::error::OcrError;
use image::DynamicImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Tesseract-backed [`TextRecognizer`]. A fresh engine handle is created per
/// call, so the recognizer is safe to share across threads.
pub struct TesseractRecognizer {
    tessdata_path: String,
}

impl TesseractRecognizer {
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&config.language)?,
        };

        // Fail at startup rather than on the first page
        Tesseract::new(Some(&tessdata_path), Some(&config.language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Tesseract recognizer initialized (tessdata: {}, language: {})",
            tessdata_path,
            config.language
        );

        Ok(Self { tessdata_path })
    }

    /// Engine handle with the image loaded and recognition done
    fn recognize(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<Tesseract, OcrError> {
        // BMP is always supported by leptonica
        let rgb = image.to_rgb8();
        let mut bmp_data = Vec::new();
        rgb.write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::Recognition(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Recognizing {}x{} image ({})",
            rgb.width(),
            rgb.height(),
            settings.config_string()
        );

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&settings.language))
            .map_err(|e| OcrError::Recognition(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess
            .set_variable("tessedit_pageseg_mode", &settings.page_seg_mode.to_string())
            .map_err(|e| {
                OcrError::Recognition(format!(
                    "Invalid page segmentation mode {}: {}",
                    settings.page_seg_mode, e
                ))
            })?;

        if let Some(oem) = settings.engine_mode {
            // Engine mode is an init-only parameter; tessdata_fast ships LSTM models only
            tracing::debug!("Engine mode {} is fixed by the language data", oem);
        }

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::Recognition(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                rgb.width(),
                rgb.height(),
                bmp_data.len(),
                e
            ))
        })?;

        tess.recognize()
            .map_err(|e| OcrError::Recognition(format!("Failed to recognize text: {}", e)))
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize_text(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<String, OcrError> {
        let mut tess = self.recognize(image, settings)?;
        tess.get_text()
            .map_err(|e| OcrError::Recognition(format!("Failed to get text: {}", e)))
    }

    fn recognize_words(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<Vec<RecognizedWord>, OcrError> {
        let mut tess = self.recognize(image, settings)?;
        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| OcrError::Recognition(format!("Failed to get word data: {}", e)))?;
        Ok(parse_tsv(&tsv))
    }
}

/// Ensure tessdata for every `+`-joined language is cached, downloading if needed.
/// Returns the directory (Tesseract expects the directory, not the file)
fn ensure_tessdata_available(language: &str) -> Result<String, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("journal-ocr")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create tessdata directory: {}", e))
    })?;

    for lang in language.split('+').filter(|l| !l.is_empty()) {
        let traineddata_path = cache_dir.join(format!("{}.traineddata", lang));
        if traineddata_path.exists() {
            tracing::info!("Using cached tessdata for '{}' from {:?}", lang, cache_dir);
            continue;
        }
        tracing::info!("Downloading tessdata for '{}' (this may take a moment)...", lang);
        download_file(&tessdata_url(lang), &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    }

    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

/// tessdata_fast keeps downloads small
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url).call().map_err(|e| {
        OcrError::InitializationError(format!("Failed to download tessdata: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read tessdata response: {}", e))
    })?;

    // Write next to the target and rename so an interrupted download is never cached
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create tessdata file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        OcrError::InitializationError(format!("Failed to write tessdata file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to store tessdata file: {}", e))
    })?;

    Ok(())
}
