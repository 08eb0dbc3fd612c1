use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;
use crate::config::DEFAULT_RESIZE_WIDTH;

/// Which optional steps run. Grayscale always runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Target width for the maintain-aspect resize.
    /// `None` uses [`DEFAULT_RESIZE_WIDTH`]; zero or negative disables resizing
    pub resize_width: Option<i64>,
    pub denoise: bool,
    pub threshold: bool,
    pub deskew: bool,
    /// Run CLAHE right after resizing
    pub enhance_contrast: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            resize_width: None,
            denoise: true,
            threshold: true,
            deskew: true,
            enhance_contrast: false,
        }
    }
}

impl PreprocessOptions {
    pub fn with_resize_width(mut self, width: i64) -> Self {
        self.resize_width = Some(width);
        self
    }

    pub fn with_denoise(mut self, denoise: bool) -> Self {
        self.denoise = denoise;
        self
    }

    pub fn with_threshold(mut self, threshold: bool) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_deskew(mut self, deskew: bool) -> Self {
        self.deskew = deskew;
        self
    }

    pub fn with_enhance_contrast(mut self, enhance: bool) -> Self {
        self.enhance_contrast = enhance;
        self
    }

    /// Width to resize to, or `None` when resizing is disabled
    pub fn target_width(&self) -> Option<u32> {
        match self.resize_width {
            None => Some(DEFAULT_RESIZE_WIDTH),
            Some(width) if width > 0 => Some(u32::try_from(width).unwrap_or(u32::MAX)),
            Some(_) => None,
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline with a fixed step order
pub struct Pipeline {
    options: PreprocessOptions,
}

impl Pipeline {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    /// Process an image: grayscale, resize, deskew, denoise, threshold
    pub fn process(&self, image: DynamicImage) -> PreprocessingResult {
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        let mut img = self.run_step("grayscale", image, &mut steps_timing, steps::grayscale::apply);

        if let Some(width) = self.options.target_width() {
            img = self.run_step("resize", img, &mut steps_timing, |img| {
                steps::resize::apply(img, width)
            });
        }

        if self.options.enhance_contrast {
            img = self.run_step("contrast", img, &mut steps_timing, steps::contrast::apply);
        }

        if self.options.deskew {
            img = self.run_step("deskew", img, &mut steps_timing, steps::deskew::apply);
        }

        if self.options.denoise {
            img = self.run_step("denoise", img, &mut steps_timing, steps::denoise::apply);
        }

        if self.options.threshold {
            img = self.run_step("threshold", img, &mut steps_timing, steps::threshold::apply);
        }

        PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        }
    }

    fn run_step<I, F>(
        &self,
        name: &str,
        img: I,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> GrayImage
    where
        F: FnOnce(I) -> GrayImage,
    {
        let step_start = Instant::now();
        let result = step_fn(img);
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Preprocessing step {} took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn step_names(result: &PreprocessingResult) -> Vec<&str> {
        result.steps.iter().map(|s| s.name.as_str()).collect()
    }

    fn page(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if y % 10 < 2 && x > 4 && x < width - 4 {
                Rgb([30, 30, 40])
            } else {
                Rgb([240, 235, 220])
            }
        }))
    }

    #[test]
    fn test_target_width_defaults_and_disables() {
        let options = PreprocessOptions::default();
        assert_eq!(options.target_width(), Some(DEFAULT_RESIZE_WIDTH));
        assert_eq!(options.clone().with_resize_width(640).target_width(), Some(640));
        assert_eq!(options.clone().with_resize_width(0).target_width(), None);
        assert_eq!(options.with_resize_width(-5).target_width(), None);
    }

    #[test]
    fn test_steps_run_in_fixed_order() {
        let options = PreprocessOptions::default()
            .with_resize_width(60)
            .with_enhance_contrast(true);
        let result = Pipeline::new(options).process(page(40, 30));

        assert_eq!(
            step_names(&result),
            vec!["grayscale", "resize", "contrast", "deskew", "denoise", "threshold"]
        );
        assert_eq!(result.image.dimensions(), (60, 45));
    }

    #[test]
    fn test_disabled_steps_are_skipped() {
        let options = PreprocessOptions::default()
            .with_resize_width(0)
            .with_denoise(false)
            .with_threshold(false)
            .with_deskew(false);
        let result = Pipeline::new(options).process(page(30, 20));

        assert_eq!(step_names(&result), vec!["grayscale"]);
        assert_eq!(result.image.dimensions(), (30, 20));
    }

    #[test]
    fn test_threshold_output_is_binary() {
        let options = PreprocessOptions::default()
            .with_resize_width(0)
            .with_denoise(false);
        let result = Pipeline::new(options).process(page(40, 40));

        assert!(result.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_grayscale_only_matches_luma_conversion() {
        let input = page(20, 20);
        let expected = input.to_luma8();
        let options = PreprocessOptions::default()
            .with_resize_width(-1)
            .with_denoise(false)
            .with_threshold(false)
            .with_deskew(false);

        let result = Pipeline::new(options).process(input);

        assert_eq!(result.image, expected);
    }
}
