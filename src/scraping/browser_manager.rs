//! Native browser management using `chromiumoxide`.
//!
//! This module is the single place that knows how to:
//! * find a usable Chromium-family executable (config → env → PATH → well-known paths),
//! * build the launch config the portal is driven with,
//! * wait for a page to settle after a form post ([`wait_until_stable`]).
//!
//! Session lifetime (context, download directory, teardown) lives in
//! [`super::session`].

use crate::core::config::{ScraperConfig, ENV_CHROME_EXECUTABLE};
use crate::core::error::ScraperError;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Desktop profile the portal is known to accept.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Chromium-family binaries looked up on `PATH`.
const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "brave-browser",
];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/local/bin/chromium",
    "/snap/bin/chromium",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

/// Find a usable Chromium-family browser executable.
///
/// Resolution order: `chrome_executable` from `ecourts.json`, the
/// `CHROME_EXECUTABLE` env var, a `PATH` scan, then well-known install paths.
pub fn find_chrome_executable(configured: Option<&str>) -> Option<String> {
    let explicit = configured
        .map(PathBuf::from)
        .into_iter()
        .chain(std::env::var_os(ENV_CHROME_EXECUTABLE).map(PathBuf::from));

    let on_path: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| {
            std::env::split_paths(&p)
                .flat_map(|dir| PATH_NAMES.iter().map(move |exe| dir.join(exe)))
                .collect()
        })
        .unwrap_or_default();

    let found = explicit
        .chain(on_path)
        .chain(INSTALL_PATHS.iter().map(PathBuf::from))
        .find(|candidate| candidate.is_file());

    match &found {
        Some(p) => debug!("browser executable: {}", p.display()),
        None => debug!("no browser executable found"),
    }
    found.map(|p| p.to_string_lossy().into_owned())
}

// ── Launch config ────────────────────────────────────────────────────────────

/// Build the `BrowserConfig` for a scraper session.
///
/// `--disable-blink-features=AutomationControlled` hides `navigator.webdriver`;
/// the portal serves a degraded page to obvious automation.
pub fn build_browser_config(
    exe: &str,
    cfg: &ScraperConfig,
) -> Result<BrowserConfig, ScraperError> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .request_timeout(cfg.browser_timeout())
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", USER_AGENT));

    if !cfg.headless {
        builder = builder.with_head();
    }

    info!(
        "browser config: exe={} headless={} timeout={}ms",
        exe, cfg.headless, cfg.browser_timeout_ms
    );
    builder.build().map_err(ScraperError::BrowserConfig)
}

// ── Network idle ─────────────────────────────────────────────────────────────

const IDLE_POLL: Duration = Duration::from_millis(250);

/// `[resource entry count, document complete]` in one round trip.
const LOAD_STATE_JS: &str =
    "[performance.getEntriesByType('resource').length, document.readyState === 'complete']";

async fn load_state(page: &Page) -> (u64, bool) {
    page.evaluate(LOAD_STATE_JS)
        .await
        .ok()
        .and_then(|v| v.into_value::<(u64, bool)>().ok())
        .unwrap_or((0, false))
}

/// Return once the document is complete and no new resource entries have
/// appeared for `quiet`, or when `timeout` runs out. Best-effort.
pub async fn wait_until_stable(page: &Page, quiet: Duration, timeout: Duration) {
    let start = Instant::now();
    let mut last_count = None;
    let mut quiet_since = Instant::now();

    while start.elapsed() < timeout {
        let (count, complete) = load_state(page).await;
        if !complete || last_count != Some(count) {
            last_count = Some(count);
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= quiet {
            debug!(
                "page idle after {}ms ({} resources)",
                start.elapsed().as_millis(),
                count
            );
            return;
        }
        tokio::time::sleep(IDLE_POLL).await;
    }
    info!("page still busy after {}ms, continuing", timeout.as_millis());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        let found = find_chrome_executable(Some(fake.to_str().unwrap()));
        assert_eq!(found.as_deref(), fake.to_str());
    }

    #[test]
    fn missing_configured_path_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("no-such-chrome");
        let found = find_chrome_executable(Some(gone.to_str().unwrap()));
        assert_ne!(found.as_deref(), gone.to_str());
    }

    #[test]
    fn user_agent_is_desktop_windows() {
        assert!(USER_AGENT.contains("Windows NT 10.0"));
    }
}
