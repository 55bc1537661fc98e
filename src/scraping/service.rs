//! Long-lived scraper for servers: one lazily started session shared by
//! all callers, one operation at a time.

use super::scraper::EcourtsScraper;
use super::session::ScraperSession;
use crate::core::error::ScraperError;
use crate::core::types::{CaseRecord, CauseListOutcome, CauseListRequest, ListingCheck};
use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

/// What the HTTP front-end needs. `Err` only for a session that could not
/// be started; `Ok(None)` is "nothing found".
#[async_trait]
pub trait EcourtsService: Send + Sync {
    async fn search_by_cnr(&self, cnr: &str) -> Result<Option<CaseRecord>, ScraperError>;

    async fn check_listing(&self, cnr: &str, date: &str)
        -> Result<Option<ListingCheck>, ScraperError>;

    async fn download_cause_list(
        &self,
        request: &CauseListRequest,
    ) -> Result<Option<CauseListOutcome>, ScraperError>;

    async fn shutdown(&self);
}

pub struct BrowserService {
    scraper: EcourtsScraper,
    session: Mutex<Option<ScraperSession>>,
}

impl BrowserService {
    pub fn new(scraper: EcourtsScraper) -> Self {
        Self {
            scraper,
            session: Mutex::new(None),
        }
    }

    /// Lock the slot, starting the browser on first use.
    async fn live_session(&self) -> Result<MutexGuard<'_, Option<ScraperSession>>, ScraperError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            info!("starting shared scraper session");
            *guard = Some(ScraperSession::launch(self.scraper.config()).await?);
        }
        Ok(guard)
    }
}

#[async_trait]
impl EcourtsService for BrowserService {
    async fn search_by_cnr(&self, cnr: &str) -> Result<Option<CaseRecord>, ScraperError> {
        let guard = self.live_session().await?;
        let Some(session) = guard.as_ref() else {
            return Ok(None);
        };
        Ok(self.scraper.search_by_cnr(session.driver(), cnr).await)
    }

    async fn check_listing(
        &self,
        cnr: &str,
        date: &str,
    ) -> Result<Option<ListingCheck>, ScraperError> {
        let guard = self.live_session().await?;
        let Some(session) = guard.as_ref() else {
            return Ok(None);
        };
        Ok(self.scraper.check_case_listed(session.driver(), cnr, date).await)
    }

    async fn download_cause_list(
        &self,
        request: &CauseListRequest,
    ) -> Result<Option<CauseListOutcome>, ScraperError> {
        let guard = self.live_session().await?;
        let Some(session) = guard.as_ref() else {
            return Ok(None);
        };
        Ok(self.scraper.download_cause_list(session.driver(), request).await)
    }

    async fn shutdown(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
        }
    }
}
