//! Output sink: JSON records and raw documents on local disk.
//!
//! Layout under the configured output root:
//!
//! ```text
//! output/
//!   json/   case_<cnr>_<stamp>.json, causelist_<...>.json
//!   pdfs/   causelist_<...>.pdf
//!   logs/   ecourts_<YYYYmmdd>.log
//! ```

use crate::core::error::ScraperError;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are not allowed in file names with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Pretty-print `value` into `json/<filename>`. Non-ASCII text is written
    /// as-is, never escaped.
    pub fn save_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        filename: &str,
    ) -> Result<PathBuf, ScraperError> {
        let body = serde_json::to_string_pretty(value)?;
        self.write(self.json_dir(), filename, body.as_bytes())
    }

    /// Store document bytes verbatim into `pdfs/<filename>`.
    pub fn save_document(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, ScraperError> {
        self.write(self.pdf_dir(), filename, bytes)
    }

    fn write(&self, dir: PathBuf, filename: &str, bytes: &[u8]) -> Result<PathBuf, ScraperError> {
        std::fs::create_dir_all(&dir).map_err(|e| ScraperError::storage(&dir, e))?;
        let path = dir.join(sanitize_filename(filename));
        std::fs::write(&path, bytes).map_err(|e| ScraperError::storage(&path, e))?;
        info!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f"), "a_b_c_d_e_f");
        assert_eq!(sanitize_filename("Tamil Nadu"), "Tamil Nadu");
    }

    #[test]
    fn json_is_pretty_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let path = store
            .save_json(&json!({ "petitioner": "राम कुमार" }), "case_x.json")
            .unwrap();

        assert_eq!(path, dir.path().join("json").join("case_x.json"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("राम कुमार"));
        assert!(written.contains("\n  \"petitioner\""));
    }

    #[test]
    fn documents_are_stored_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let bytes = b"%PDF-1.4\n\x00\xff binary";
        let path = store.save_document(bytes, "causelist_a/b.pdf").unwrap();

        assert_eq!(path.file_name().unwrap(), "causelist_a_b.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn directories_are_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out"));
        assert!(!store.json_dir().exists());
        store.save_json(&json!({ "cnr": "X" }), "case.json").unwrap();
        assert!(store.json_dir().is_dir());
        assert!(!store.pdf_dir().exists());
        assert_eq!(store.log_dir(), dir.path().join("out").join("logs"));
    }
}
