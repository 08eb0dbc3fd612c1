//! Raster input: where an image comes from and how it is decoded.

use crate::error::OcrError;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// A raster image to process, either on disk or already in memory
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Bytes { name: &'a str, data: &'a [u8] },
}

impl<'a> ImageSource<'a> {
    /// Identifier used in errors and logs
    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { name, .. } => (*name).to_string(),
        }
    }

    /// Decode the source, sniffing the format from its content.
    ///
    /// Fails with [`OcrError::ImageLoad`] when the source cannot be read or
    /// decoded, or when it decodes to a zero-area image.
    pub fn load(&self) -> Result<DynamicImage, OcrError> {
        let decoded = match self {
            ImageSource::Path(path) => ImageReader::open(path)
                .map_err(|e| OcrError::image_load(self.label(), e))?
                .with_guessed_format()
                .map_err(|e| OcrError::image_load(self.label(), e))?
                .decode(),
            ImageSource::Bytes { data, .. } => ImageReader::new(Cursor::new(*data))
                .with_guessed_format()
                .map_err(|e| OcrError::image_load(self.label(), e))?
                .decode(),
        };

        let image = decoded.map_err(|e| OcrError::image_load(self.label(), e))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::image_load(
                self.label(),
                format!("image has zero area ({}x{})", image.width(), image.height()),
            ));
        }

        Ok(image)
    }
}

impl<'a> From<&'a Path> for ImageSource<'a> {
    fn from(path: &'a Path) -> Self {
        ImageSource::Path(path)
    }
}

/// Width and height of a decodable image
pub fn image_dimensions(source: ImageSource<'_>) -> Result<(u32, u32), OcrError> {
    let image = source.load()?;
    Ok((image.width(), image.height()))
}

/// Whether the source decodes to a non-empty raster. Never fails.
pub fn is_valid_image(source: ImageSource<'_>) -> bool {
    match source.load() {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Invalid image file: {}", e);
            false
        }
    }
}
