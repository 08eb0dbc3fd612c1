//! Individual preprocessing steps

pub mod contrast;
pub mod denoise;
pub mod deskew;
pub mod grayscale;
pub mod resize;
pub mod threshold;
