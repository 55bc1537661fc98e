//! One browser, one isolated context, one page.
//!
//! Teardown runs level by level (page → context → browser → CDP handler →
//! download dir) and every level is attempted even when an earlier one
//! fails, so no Chromium process outlives the session.

use super::browser_manager::{build_browser_config, find_chrome_executable};
use super::cdp::CdpDriver;
use super::driver::PageDriver;
use crate::core::config::ScraperConfig;
use crate::core::error::ScraperError;
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Browser;
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ScraperSession {
    browser: Option<Browser>,
    context_id: Option<BrowserContextId>,
    driver: CdpDriver,
    handler_task: Option<JoinHandle<()>>,
    download_dir: Option<TempDir>,
}

impl ScraperSession {
    /// Start the browser and open a page in a fresh context with downloads
    /// routed to a private temp dir.
    pub async fn launch(cfg: &ScraperConfig) -> Result<Self, ScraperError> {
        let exe = find_chrome_executable(cfg.chrome_executable.as_deref())
            .ok_or(ScraperError::BrowserNotFound)?;
        info!("initializing browser ({})", exe);

        let config = build_browser_config(&exe, cfg)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserLaunch(format!("{}: {}", exe, e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        match open_page(&browser).await {
            Ok((context_id, driver, download_dir)) => {
                info!("browser initialized");
                Ok(Self {
                    browser: Some(browser),
                    context_id: Some(context_id),
                    driver,
                    handler_task: Some(handler_task),
                    download_dir: Some(download_dir),
                })
            }
            Err(e) => {
                warn!("session setup failed, shutting browser down: {}", e);
                shutdown_browser(&mut browser).await;
                handler_task.abort();
                Err(e)
            }
        }
    }

    pub fn driver(&self) -> &dyn PageDriver {
        &self.driver
    }

    /// Release everything the session holds. Failures at one level are
    /// logged and do not stop the next.
    pub async fn close(mut self) {
        if let Err(e) = self.driver.page().clone().close().await {
            debug!("page close: {}", e);
        }

        if let (Some(browser), Some(id)) = (self.browser.as_ref(), self.context_id.take()) {
            if let Err(e) = browser.execute(DisposeBrowserContextParams::new(id)).await {
                debug!("context dispose: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            shutdown_browser(&mut browser).await;
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        if let Some(dir) = self.download_dir.take() {
            if let Err(e) = dir.close() {
                debug!("download dir cleanup: {}", e);
            }
        }
        info!("browser closed");
    }
}

async fn open_page(
    browser: &Browser,
) -> Result<(BrowserContextId, CdpDriver, TempDir), ScraperError> {
    let context_id = browser
        .execute(CreateBrowserContextParams::default())
        .await
        .map_err(|e| ScraperError::SessionSetup(format!("create context: {}", e)))?
        .result
        .browser_context_id;

    let download_dir = tempfile::Builder::new()
        .prefix("ecourts-downloads-")
        .tempdir()
        .map_err(|e| ScraperError::SessionSetup(format!("download dir: {}", e)))?;

    let behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .browser_context_id(context_id.clone())
        .download_path(download_dir.path().to_string_lossy().to_string())
        .build()
        .map_err(ScraperError::SessionSetup)?;
    browser
        .execute(behavior)
        .await
        .map_err(|e| ScraperError::SessionSetup(format!("download behavior: {}", e)))?;

    let target = CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id.clone())
        .build()
        .map_err(ScraperError::SessionSetup)?;
    let page = browser
        .new_page(target)
        .await
        .map_err(|e| ScraperError::SessionSetup(format!("open page: {}", e)))?;

    let driver = CdpDriver::new(page, download_dir.path());
    Ok((context_id, driver, download_dir))
}

async fn shutdown_browser(browser: &mut Browser) {
    if let Err(e) = browser.close().await {
        debug!("browser close: {}", e);
    }
    match tokio::time::timeout(Duration::from_secs(5), browser.wait()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!("browser wait: {}", e),
        Err(_) => {
            warn!("browser did not exit in time, killing");
            if let Some(Err(e)) = browser.kill().await {
                warn!("browser kill: {}", e);
            }
        }
    }
}

impl Drop for ScraperSession {
    fn drop(&mut self) {
        let task = self.handler_task.take();
        // Drop cannot await; hand the browser to the runtime if one is around.
        // The handler must keep running until the close command went out.
        let (Some(mut browser), Ok(handle)) =
            (self.browser.take(), tokio::runtime::Handle::try_current())
        else {
            if let Some(task) = task {
                task.abort();
            }
            return;
        };
        handle.spawn(async move {
            shutdown_browser(&mut browser).await;
            if let Some(task) = task {
                task.abort();
            }
        });
    }
}
