use super::locator::Locator;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("cdp: {0}")]
    Cdp(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the navigation flows need from a live page.
///
/// All element-level calls act on the first element matched by the given
/// [`Locator`]. The chromiumoxide-backed implementation is
/// [`super::cdp::CdpDriver`]; tests substitute scripted fakes.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError>;

    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Replace the element's value and fire `input`/`change`.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError>;

    /// Select the option whose label matches `label` (exact first, then
    /// substring, both case-insensitive). `Ok(false)` when nothing matched.
    async fn select_by_label(&self, locator: &Locator, label: &str) -> Result<bool, DriverError>;

    /// Select the first option after the placeholder and return its label.
    async fn select_first_option(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Labels of all non-placeholder options of a `<select>`.
    async fn option_labels(&self, locator: &Locator) -> Result<Vec<String>, DriverError>;

    /// PNG bytes of the element as rendered.
    async fn capture_element(&self, locator: &Locator) -> Result<Vec<u8>, DriverError>;

    async fn content(&self) -> Result<String, DriverError>;

    /// Best-effort: returns once the page looks idle or `timeout` elapses.
    async fn wait_for_network_idle(&self, timeout: Duration);

    /// Bytes of a document the page handed to the browser's download
    /// manager within `timeout`, if any.
    async fn take_download(&self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverError>;

    /// Full-page PNG snapshot written to `path`.
    async fn save_snapshot(&self, path: &Path) -> Result<(), DriverError>;
}
