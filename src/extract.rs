//! Screenshot text extraction via an external OCR engine.
//!
//! The production implementation shells out to the `tesseract` binary.
//! Extraction is strictly best-effort: the search pipeline absorbs every
//! failure here as an empty contribution.

use std::path::Path;
use std::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("ocr engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("image not readable: {0}")]
    UnreadableImage(String),
}

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &Path) -> Result<String, ExtractionError>;
}

/// Runs `tesseract <image> stdout -l <languages>`.
pub struct TesseractExtractor {
    command: String,
    languages: String,
}

impl TesseractExtractor {
    pub fn new(command: &str, languages: &str) -> Self {
        Self {
            command: command.to_string(),
            languages: languages.to_string(),
        }
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract_text(&self, image: &Path) -> Result<String, ExtractionError> {
        if !image.is_file() {
            return Err(ExtractionError::UnreadableImage(format!(
                "no such file: {}",
                image.display()
            )));
        }

        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.languages])
            .output()
            .map_err(|err| ExtractionError::EngineUnavailable(err.to_string()))?;

        if !output.status.success() {
            return Err(ExtractionError::UnreadableImage(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extractor for OCR-disabled configurations and tests. Always contributes
/// nothing.
pub struct NullExtractor;

impl TextExtractor for NullExtractor {
    fn extract_text(&self, _image: &Path) -> Result<String, ExtractionError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_unreadable() {
        let extractor = TesseractExtractor::new("tesseract", "ukr+eng");
        let result = extractor.extract_text(&PathBuf::from("/no/such/screenshot.png"));
        assert!(matches!(result, Err(ExtractionError::UnreadableImage(_))));
    }

    #[test]
    fn test_missing_engine_is_unavailable() {
        let dir = std::env::temp_dir();
        let image = dir.join(format!("dovidka-extract-test-{}.png", std::process::id()));
        std::fs::write(&image, b"not really a png").unwrap();

        let extractor = TesseractExtractor::new("definitely-not-a-real-ocr-binary", "eng");
        let result = extractor.extract_text(&image);
        assert!(matches!(result, Err(ExtractionError::EngineUnavailable(_))));

        let _ = std::fs::remove_file(&image);
    }

    #[test]
    fn test_null_extractor_is_empty() {
        let result = NullExtractor
            .extract_text(&PathBuf::from("/anything.png"))
            .unwrap();
        assert_eq!(result, "");
    }
}
