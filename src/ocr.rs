//! OCR orchestration: preprocessing, recognition, and text cleanup as one unit.

use crate::engine::{RecognitionSettings, RecognizedWord, TextRecognizer};
use crate::error::OcrError;
use crate::image_io::ImageSource;
use crate::preprocessing::{Pipeline, PreprocessOptions};
use crate::text::cleanup_text;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text recognized from one image with its aggregate confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    /// Mean confidence of the kept words, 0-100
    pub confidence: f64,
    pub word_count: usize,
}

impl RecognitionResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            word_count: 0,
        }
    }
}

/// Aggregate word-level output.
///
/// Words with confidence <= 0 (including the -1 "no data" marker) are dropped.
/// Kept words are joined with single spaces in the order given, the
/// confidence is their mean, and non-empty text is cleaned up.
pub fn aggregate_words(words: &[RecognizedWord]) -> RecognitionResult {
    let kept: Vec<&RecognizedWord> = words.iter().filter(|w| w.confidence > 0).collect();
    if kept.is_empty() {
        return RecognitionResult::empty();
    }

    let joined = kept
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let total: i64 = kept.iter().map(|w| w.confidence as i64).sum();

    RecognitionResult {
        text: if joined.is_empty() {
            joined
        } else {
            cleanup_text(&joined)
        },
        confidence: total as f64 / kept.len() as f64,
        word_count: kept.len(),
    }
}

/// Drives preprocessing, recognition and normalization for single images.
///
/// Holds only fixed configuration, so one orchestrator can serve concurrent
/// calls as long as the recognizer can.
#[derive(Clone)]
pub struct OcrOrchestrator {
    recognizer: Arc<dyn TextRecognizer>,
    settings: RecognitionSettings,
    options: PreprocessOptions,
}

impl OcrOrchestrator {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, settings: RecognitionSettings) -> Self {
        Self {
            recognizer,
            settings,
            options: PreprocessOptions::default(),
        }
    }

    /// Replace the options used when preprocessing is requested
    pub fn with_preprocess_options(mut self, options: PreprocessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    /// Extract text from an image.
    ///
    /// Any load or recognition failure comes back as
    /// [`OcrError::OcrProcessing`] naming the source.
    pub fn process_image(
        &self,
        source: ImageSource<'_>,
        preprocess: bool,
        cleanup: bool,
    ) -> Result<String, OcrError> {
        let label = source.label();
        tracing::info!("Processing image for OCR: {}", label);

        let text = self
            .prepare(source, preprocess)
            .and_then(|image| self.recognizer.recognize_text(&image, &self.settings))
            .map_err(|e| {
                tracing::error!("OCR processing failed: {}", e);
                OcrError::processing(&label, e)
            })?;

        Ok(if cleanup { cleanup_text(&text) } else { text })
    }

    /// Extract text with confidence metrics from an image.
    /// The text is always cleaned up
    pub fn process_image_with_confidence(
        &self,
        source: ImageSource<'_>,
        preprocess: bool,
    ) -> Result<RecognitionResult, OcrError> {
        let label = source.label();
        tracing::info!("Processing image for OCR with confidence: {}", label);

        let words = self
            .prepare(source, preprocess)
            .and_then(|image| self.recognizer.recognize_words(&image, &self.settings))
            .map_err(|e| {
                tracing::error!("OCR processing with confidence failed: {}", e);
                OcrError::processing(&label, e)
            })?;

        let result = aggregate_words(&words);
        tracing::debug!(
            "Recognized {} words from {}, confidence {:.2}",
            result.word_count,
            label,
            result.confidence
        );
        Ok(result)
    }

    fn prepare(&self, source: ImageSource<'_>, preprocess: bool) -> Result<DynamicImage, OcrError> {
        let image = source.load()?;
        if !preprocess {
            return Ok(image);
        }
        let processed = Pipeline::new(self.options.clone()).process(image);
        Ok(DynamicImage::ImageLuma8(processed.image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Returns canned output and records the images it was handed
    struct ScriptedRecognizer {
        text: String,
        words: Vec<RecognizedWord>,
        fail: bool,
        seen: Mutex<Vec<(u32, u32, bool)>>,
    }

    impl ScriptedRecognizer {
        fn new(text: &str, words: Vec<RecognizedWord>) -> Self {
            Self {
                text: text.to_string(),
                words,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("", Vec::new())
            }
        }

        fn record(&self, image: &DynamicImage) -> Result<(), OcrError> {
            let is_gray = matches!(image, DynamicImage::ImageLuma8(_));
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height(), is_gray));
            if self.fail {
                return Err(OcrError::Recognition("engine exploded".to_string()));
            }
            Ok(())
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn recognize_text(
            &self,
            image: &DynamicImage,
            _settings: &RecognitionSettings,
        ) -> Result<String, OcrError> {
            self.record(image)?;
            Ok(self.text.clone())
        }

        fn recognize_words(
            &self,
            image: &DynamicImage,
            _settings: &RecognitionSettings,
        ) -> Result<Vec<RecognizedWord>, OcrError> {
            self.record(image)?;
            Ok(self.words.clone())
        }
    }

    fn png_page() -> Vec<u8> {
        let img = image::RgbImage::from_fn(48, 32, |x, y| {
            if y % 8 < 2 && (4..44).contains(&x) {
                image::Rgb([20, 20, 20])
            } else {
                image::Rgb([230, 230, 220])
            }
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn orchestrator(recognizer: Arc<ScriptedRecognizer>) -> OcrOrchestrator {
        OcrOrchestrator::new(recognizer, RecognitionSettings::default())
            .with_preprocess_options(PreprocessOptions::default().with_resize_width(96))
    }

    fn words(confidences: &[(&str, i32)]) -> Vec<RecognizedWord> {
        confidences
            .iter()
            .map(|(text, conf)| RecognizedWord::new(*text, *conf))
            .collect()
    }

    #[test]
    fn test_aggregate_drops_non_positive_confidence() {
        let result = aggregate_words(&words(&[("", -1), ("noise", 0), ("Dear", 80), ("diary", 90)]));
        assert_eq!(result.text, "Dear diary");
        assert_eq!(result.confidence, 85.0);
        assert_eq!(result.word_count, 2);
    }

    #[test]
    fn test_aggregate_without_confident_words_is_empty() {
        let result = aggregate_words(&words(&[(" ", -1), ("x", 0)]));
        assert_eq!(result, RecognitionResult::empty());
        assert_eq!(aggregate_words(&[]), RecognitionResult::empty());
    }

    #[test]
    fn test_aggregate_keeps_order_and_cleans_text() {
        let result = aggregate_words(&words(&[
            ("It", 91),
            ("'", 40),
            ("s", 70),
            ("sim|lar", 60),
            (".", 30),
        ]));
        assert_eq!(result.text, "It's simIlar.");
        assert_eq!(result.word_count, 5);
        assert!((result.confidence - 58.2).abs() < 1e-9);
    }

    #[test]
    fn test_process_image_preprocesses_and_cleans() {
        let recognizer = Arc::new(ScriptedRecognizer::new("Dear  diary ,\n\n\n\ntoday", vec![]));
        let data = png_page();
        let source = ImageSource::Bytes {
            name: "page-1.png",
            data: &data,
        };

        let text = orchestrator(recognizer.clone())
            .process_image(source, true, true)
            .unwrap();

        assert_eq!(text, "Dear diary,\n\ntoday");
        assert_eq!(recognizer.seen.lock().unwrap().as_slice(), &[(96, 64, true)]);
    }

    #[test]
    fn test_process_image_without_preprocess_or_cleanup() {
        let raw = "Dear  diary ,\n";
        let recognizer = Arc::new(ScriptedRecognizer::new(raw, vec![]));
        let data = png_page();
        let source = ImageSource::Bytes {
            name: "page-1.png",
            data: &data,
        };

        let text = orchestrator(recognizer.clone())
            .process_image(source, false, false)
            .unwrap();

        assert_eq!(text, raw);
        // Unmodified colour image handed straight to the recognizer
        assert_eq!(recognizer.seen.lock().unwrap().as_slice(), &[(48, 32, false)]);
    }

    #[test]
    fn test_process_image_with_confidence_aggregates() {
        let recognizer = Arc::new(ScriptedRecognizer::new(
            "",
            words(&[("", -1), ("", 0), ("Hello", 80), ("world", 90)]),
        ));
        let data = png_page();
        let source = ImageSource::Bytes {
            name: "page-2.png",
            data: &data,
        };

        let result = orchestrator(recognizer)
            .process_image_with_confidence(source, true)
            .unwrap();

        assert_eq!(result.text, "Hello world");
        assert_eq!(result.confidence, 85.0);
        assert_eq!(result.word_count, 2);
    }

    #[test]
    fn test_recognition_failure_names_the_image() {
        let recognizer = Arc::new(ScriptedRecognizer::failing());
        let data = png_page();
        let source = ImageSource::Bytes {
            name: "page-3.png",
            data: &data,
        };

        let err = orchestrator(recognizer)
            .process_image_with_confidence(source, false)
            .unwrap_err();

        match &err {
            OcrError::OcrProcessing { image, cause } => {
                assert_eq!(image, "page-3.png");
                assert!(matches!(**cause, OcrError::Recognition(_)));
            }
            other => panic!("expected OcrProcessing, got {other:?}"),
        }
    }

    #[test]
    fn test_load_failure_is_wrapped_and_recognizer_not_called() {
        let recognizer = Arc::new(ScriptedRecognizer::new("never", vec![]));
        let source = ImageSource::Bytes {
            name: "notes.txt",
            data: b"plain text, not pixels",
        };

        let err = orchestrator(recognizer.clone())
            .process_image(source, true, true)
            .unwrap_err();

        assert!(matches!(err.root_cause(), OcrError::ImageLoad { .. }));
        assert!(err.to_string().contains("notes.txt"));
        assert!(recognizer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_orchestrator_uses_default_preprocessing() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(ScriptedRecognizer::new("", vec![]));
        let orchestrator = OcrOrchestrator::new(recognizer, RecognitionSettings::default());
        assert_eq!(orchestrator.options, PreprocessOptions::default());
        assert_eq!(orchestrator.recognizer_name(), "scripted");
    }
}
