//! Image preprocessing that conditions a page photo or scan for OCR.
//!
//! Steps always run in the same order: grayscale, resize, deskew, denoise,
//! threshold. Each reads the previous step's output.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessOptions, PreprocessingResult, StepTiming};

use crate::error::OcrError;
use crate::image_io::ImageSource;
use image::GrayImage;

/// Load `source` and run the pipeline with `options`.
///
/// Fails with [`OcrError::ImageLoad`] when the source cannot be decoded or
/// has zero area. Steps that find too little signal are skipped, never errors.
pub fn preprocess(source: ImageSource<'_>, options: &PreprocessOptions) -> Result<GrayImage, OcrError> {
    tracing::info!("Preprocessing image: {}", source.label());
    let image = source.load()?;
    Ok(Pipeline::new(options.clone()).process(image).image)
}

/// Localized contrast enhancement for pages a caller judges too flat.
/// Not part of the default pipeline
pub fn enhance_contrast(image: GrayImage) -> GrayImage {
    steps::contrast::apply(image)
}
