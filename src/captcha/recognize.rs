use async_trait::async_trait;
use image::GrayImage;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Codes shorter than this are treated as misreads.
pub const MIN_CODE_LEN: usize = 4;

const ALPHANUMERIC: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const NUMERIC: &str = "0123456789";

/// Which characters a verification code may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetPolicy {
    Alphanumeric,
    Numeric,
}

impl CharsetPolicy {
    pub fn whitelist(&self) -> &'static str {
        match self {
            CharsetPolicy::Alphanumeric => ALPHANUMERIC,
            CharsetPolicy::Numeric => NUMERIC,
        }
    }

    pub fn allows(&self, c: char) -> bool {
        match self {
            CharsetPolicy::Alphanumeric => c.is_ascii_alphanumeric(),
            CharsetPolicy::Numeric => c.is_ascii_digit(),
        }
    }
}

/// Keep only policy characters; `None` when fewer than [`MIN_CODE_LEN`] remain.
pub fn clean_candidate(raw: &str, policy: CharsetPolicy) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| policy.allows(*c)).collect();
    if cleaned.chars().count() >= MIN_CODE_LEN {
        Some(cleaned)
    } else {
        None
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("could not start OCR engine '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("OCR scratch file: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR scratch image: {0}")]
    Image(#[from] image::ImageError),
}

/// A single-line text reader. The production engine is [`TesseractCli`].
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Raw engine output for one line of text restricted to `policy`.
    async fn read_line(&self, image: &GrayImage, policy: CharsetPolicy) -> Result<String, OcrError>;
}

/// Runs the `tesseract` binary on a temp PNG (LSTM engine, single-line mode).
#[derive(Debug, Clone)]
pub struct TesseractCli {
    cmd: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            cmd: "tesseract".to_string(),
        }
    }
}

impl TesseractCli {
    pub fn new(cmd: Option<&str>) -> Self {
        match cmd {
            Some(c) if !c.trim().is_empty() => Self { cmd: c.to_string() },
            _ => Self::default(),
        }
    }

    pub fn args_for(policy: CharsetPolicy) -> Vec<String> {
        vec![
            "--oem".into(),
            "3".into(),
            "--psm".into(),
            "7".into(),
            "-c".into(),
            format!("tessedit_char_whitelist={}", policy.whitelist()),
        ]
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn read_line(&self, image: &GrayImage, policy: CharsetPolicy) -> Result<String, OcrError> {
        let input = NamedTempFile::with_suffix(".png")?;
        image.save(input.path())?;

        let output = Command::new(&self.cmd)
            .arg(input.path())
            .arg("stdout")
            .args(Self::args_for(policy))
            .output()
            .await
            .map_err(|source| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Read a code under `policy`. Engine failures are logged and read as "no code".
pub async fn recognize(
    engine: &dyn TextRecognizer,
    image: &GrayImage,
    policy: CharsetPolicy,
) -> Option<String> {
    let raw = match engine.read_line(image, policy).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("OCR ({:?}) failed: {}", policy, e);
            return None;
        }
    };
    match clean_candidate(&raw, policy) {
        Some(code) => {
            info!("verification code read ({:?}): {}", policy, code);
            Some(code)
        }
        None => {
            debug!("OCR ({:?}) text too short: {:?}", policy, raw.trim());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl TextRecognizer for Fixed {
        async fn read_line(&self, _: &GrayImage, _: CharsetPolicy) -> Result<String, OcrError> {
            self.0.map(str::to_string).map_err(|_| OcrError::Failed {
                status: "exit status: 1".into(),
                stderr: "boom".into(),
            })
        }
    }

    fn img() -> GrayImage {
        GrayImage::from_pixel(4, 4, Luma([255]))
    }

    #[test]
    fn cleaning_strips_whitespace_and_symbols() {
        assert_eq!(
            clean_candidate(" a B-3 x\n", CharsetPolicy::Alphanumeric).as_deref(),
            Some("aB3x")
        );
        assert_eq!(clean_candidate("12a34", CharsetPolicy::Numeric).as_deref(), Some("1234"));
        assert_eq!(clean_candidate("ab 1", CharsetPolicy::Alphanumeric), None);
        assert_eq!(clean_candidate("", CharsetPolicy::Numeric), None);
    }

    #[test]
    fn whitelist_matches_policy() {
        for c in CharsetPolicy::Alphanumeric.whitelist().chars() {
            assert!(CharsetPolicy::Alphanumeric.allows(c));
        }
        assert_eq!(CharsetPolicy::Numeric.whitelist(), "0123456789");
        let args = TesseractCli::args_for(CharsetPolicy::Numeric);
        assert_eq!(args[..4], ["--oem", "3", "--psm", "7"]);
        assert_eq!(args[5], "tessedit_char_whitelist=0123456789");
    }

    #[tokio::test]
    async fn engine_failure_reads_as_none() {
        let out = recognize(&Fixed(Err(())), &img(), CharsetPolicy::Alphanumeric).await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn missing_binary_is_an_error_not_a_panic() {
        let engine = TesseractCli::new(Some("/nonexistent/tesseract-binary"));
        let err = engine
            .read_line(&img(), CharsetPolicy::Numeric)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
        assert_eq!(recognize(&engine, &img(), CharsetPolicy::Numeric).await, None);
    }

    #[tokio::test]
    async fn accepted_code_is_cleaned() {
        let out = recognize(&Fixed(Ok("X7 k9Q\n")), &img(), CharsetPolicy::Alphanumeric).await;
        assert_eq!(out.as_deref(), Some("X7k9Q"));
    }
}
