//! chromiumoxide-backed [`PageDriver`].

use super::browser_manager;
use super::driver::{DriverError, PageDriver};
use super::locator::Locator;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Attribute used to pin an element found by a text strategy so it can be
/// re-fetched as a regular CSS match.
const TEXT_TARGET_ATTR: &str = "data-ecourts-target";

/// Chrome writes in-flight downloads with this suffix.
const PARTIAL_DOWNLOAD_EXT: &str = "crdownload";

#[derive(Clone)]
pub struct CdpDriver {
    page: Page,
    download_dir: PathBuf,
}

impl CdpDriver {
    pub fn new(page: Page, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            download_dir: download_dir.into(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn element(&self, locator: &Locator) -> Result<Element, DriverError> {
        match locator {
            Locator::Css(sel) => self
                .page
                .find_element(sel.as_str())
                .await
                .map_err(|_| DriverError::NotFound(sel.clone())),
            Locator::Text { tag, text } => {
                if !self.mark_by_text(tag, text).await? {
                    return Err(DriverError::NotFound(locator.to_string()));
                }
                self.page
                    .find_element(format!("[{}='1']", TEXT_TARGET_ATTR))
                    .await
                    .map_err(|_| DriverError::NotFound(locator.to_string()))
            }
        }
    }

    /// Tag the first (preferably visible) `tag` element whose text contains
    /// `text`. Returns whether one was found.
    async fn mark_by_text(&self, tag: &str, text: &str) -> Result<bool, DriverError> {
        let script = format!(
            r#"(() => {{
                const attr = '{attr}';
                const tag = {tag};
                const needle = {needle}.trim().toLowerCase();
                document.querySelectorAll('[' + attr + ']').forEach(el => el.removeAttribute(attr));
                const label = el => (el.innerText || el.value || el.textContent || '').trim().toLowerCase();
                const all = Array.from(document.querySelectorAll(tag)).filter(el => label(el).includes(needle));
                const hit = all.find(el => el.offsetParent !== null) || all[0];
                if (!hit) return false;
                hit.setAttribute(attr, '1');
                return true;
            }})()"#,
            attr = TEXT_TARGET_ATTR,
            tag = js_string(tag)?,
            needle = js_string(text)?,
        );
        self.page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn call_on(
        &self,
        locator: &Locator,
        function: String,
    ) -> Result<Option<serde_json::Value>, DriverError> {
        let el = self.element(locator).await?;
        let ret = el
            .call_js_fn(function, false)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        if let Some(ex) = ret.exception_details {
            return Err(DriverError::Script(ex.text));
        }
        Ok(ret.result.value)
    }

    fn completed_download(&self) -> Result<(Option<PathBuf>, bool), DriverError> {
        let mut in_progress = false;
        if !self.download_dir.exists() {
            return Ok((None, false));
        }
        for entry in std::fs::read_dir(&self.download_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let partial = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(PARTIAL_DOWNLOAD_EXT))
                .unwrap_or(false);
            if partial {
                in_progress = true;
                continue;
            }
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            if !hidden && path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
                return Ok((Some(path), in_progress));
            }
        }
        Ok((None, in_progress))
    }
}

fn js_string(value: &str) -> Result<String, DriverError> {
    serde_json::to_string(value).map_err(|e| DriverError::Script(e.to_string()))
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Cdp(format!("goto {}: {}", url, e)))?;
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        match locator {
            Locator::Css(sel) => Ok(self.page.find_element(sel.as_str()).await.is_ok()),
            Locator::Text { tag, text } => self.mark_by_text(tag, text).await,
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let el = self.element(locator).await?;
        el.click()
            .await
            .map_err(|e| DriverError::Cdp(format!("click {}: {}", locator, e)))?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        let function = format!(
            r#"function() {{
                this.focus();
                this.value = {value};
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"#,
            value = js_string(value)?,
        );
        self.call_on(locator, function).await?;
        Ok(())
    }

    async fn select_by_label(&self, locator: &Locator, label: &str) -> Result<bool, DriverError> {
        let function = format!(
            r#"function() {{
                const want = {label}.trim().toLowerCase();
                const opts = Array.from(this.options || []);
                const text = o => (o.text || '').trim().toLowerCase();
                const hit = opts.find(o => text(o) === want) || opts.find(o => want && text(o).includes(want));
                if (!hit) return false;
                this.value = hit.value;
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }}"#,
            label = js_string(label)?,
        );
        let value = self.call_on(locator, function).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn select_first_option(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let function = r#"function() {
            const opts = Array.from(this.options || []);
            const hit = opts.slice(1).find(o => !o.disabled && (o.value || '').trim() !== '');
            if (!hit) return null;
            this.value = hit.value;
            this.dispatchEvent(new Event('input', { bubbles: true }));
            this.dispatchEvent(new Event('change', { bubbles: true }));
            return (hit.text || '').trim();
        }"#
        .to_string();
        let value = self.call_on(locator, function).await?;
        Ok(value.and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    async fn option_labels(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        let function = r#"function() {
            return Array.from(this.options || [])
                .slice(1)
                .filter(o => !o.disabled && (o.value || '').trim() !== '')
                .map(o => (o.text || '').trim());
        }"#
        .to_string();
        let value = self.call_on(locator, function).await?;
        Ok(value
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .unwrap_or_default())
    }

    async fn capture_element(&self, locator: &Locator) -> Result<Vec<u8>, DriverError> {
        let el = self.element(locator).await?;
        el.screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| DriverError::Cdp(format!("screenshot {}: {}", locator, e)))
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|e| DriverError::Cdp(format!("content: {}", e)))
    }

    async fn wait_for_network_idle(&self, timeout: Duration) {
        browser_manager::wait_until_stable(&self.page, Duration::from_secs(1), timeout).await;
    }

    async fn take_download(&self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverError> {
        let start = Instant::now();
        // An in-flight download may take longer than the detection window.
        let hard_limit = timeout * 10;
        loop {
            let (done, in_progress) = self.completed_download()?;
            if let Some(path) = done {
                let bytes = tokio::fs::read(&path).await?;
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    debug!("could not clear {}: {}", path.display(), e);
                }
                return Ok(Some(bytes));
            }
            let elapsed = start.elapsed();
            if elapsed >= hard_limit || (elapsed >= timeout && !in_progress) {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn save_snapshot(&self, path: &Path) -> Result<(), DriverError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        self.page
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
                path,
            )
            .await
            .map_err(|e| DriverError::Cdp(format!("snapshot {}: {}", path.display(), e)))?;
        Ok(())
    }
}
