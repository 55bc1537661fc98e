//! Operation layer: navigation → extraction → persistence.

use super::driver::PageDriver;
use super::navigation::{CauseListSubmission, Navigator, SubmissionResult};
use crate::captcha::{CaptchaSolver, TesseractCli, TextRecognizer};
use crate::core::config::ScraperConfig;
use crate::core::dates;
use crate::core::types::{
    CaseRecord, CauseList, CauseListOutcome, CauseListRequest, ListingCheck,
};
use crate::extract::{parse_case_details, parse_cause_list, CauseListMeta, Extraction};
use crate::features::storage::{sanitize_filename, OutputStore};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{error, info, warn};

/// `case_<cnr>_<YYYYmmdd_HHMMSS>.json`
pub fn case_filename(cnr: &str, at: DateTime<Local>) -> String {
    format!(
        "case_{}_{}.json",
        sanitize_filename(cnr),
        at.format("%Y%m%d_%H%M%S")
    )
}

/// `causelist_<state>_<district>[_<court>]_<DDMMYYYY>_<type>.<ext>`
///
/// The court segment keeps lists of one complex apart; it is left out when
/// no court is known.
pub fn cause_list_filename(
    request: &CauseListRequest,
    court_name: &str,
    date: &str,
    ext: &str,
) -> String {
    let court = court_name.trim();
    let court = if court.is_empty() {
        String::new()
    } else {
        format!("_{}", sanitize_filename(court))
    };
    format!(
        "causelist_{}_{}{}_{}_{}.{}",
        sanitize_filename(&request.state),
        sanitize_filename(&request.district),
        court,
        dates::compact(date),
        request.list_type,
        ext
    )
}

/// Store whatever the portal returned for a cause list.
///
/// Documents are written verbatim and `parse` is never called for them.
pub fn finish_cause_list<F>(
    submission: CauseListSubmission,
    request: &CauseListRequest,
    date: &str,
    store: &OutputStore,
    parse: F,
) -> Option<CauseListOutcome>
where
    F: FnOnce(&str, &CauseListMeta) -> Extraction<CauseList>,
{
    match submission.result {
        SubmissionResult::Document(bytes) => {
            let name = cause_list_filename(request, &submission.court_name, date, "pdf");
            match store.save_document(&bytes, &name) {
                Ok(path) => {
                    info!("cause list downloaded: {}", path.display());
                    Some(CauseListOutcome::Document { path })
                }
                Err(e) => {
                    error!("could not store cause list document: {}", e);
                    None
                }
            }
        }
        SubmissionResult::Page(html) => {
            let meta = CauseListMeta {
                date: date.to_string(),
                state: request.state.clone(),
                district: request.district.clone(),
                court_complex: request.court_complex.clone(),
                court_name: submission.court_name,
                judge_name: None,
                list_type: request.list_type,
            };
            let cause_list = parse(&html, &meta).into_record("cause list")?;
            let name = cause_list_filename(request, &cause_list.court_name, date, "json");
            match store.save_json(&cause_list, &name) {
                Ok(path) => {
                    info!(
                        "cause list data saved: {} ({} cases)",
                        path.display(),
                        cause_list.total_cases()
                    );
                    Some(CauseListOutcome::Parsed { path, cause_list })
                }
                Err(e) => {
                    error!("could not store cause list: {}", e);
                    None
                }
            }
        }
    }
}

/// Stateless over the page: every operation takes the driver it runs on.
#[derive(Clone)]
pub struct EcourtsScraper {
    config: Arc<ScraperConfig>,
    solver: CaptchaSolver,
    store: OutputStore,
}

impl EcourtsScraper {
    pub fn new(config: Arc<ScraperConfig>, engine: Arc<dyn TextRecognizer>) -> Self {
        let store = OutputStore::new(&config.output_dir);
        Self {
            config,
            solver: CaptchaSolver::new(engine),
            store,
        }
    }

    /// Production wiring: Tesseract from `tesseract_cmd` (or PATH).
    pub fn from_config(config: Arc<ScraperConfig>) -> Self {
        let engine = Arc::new(TesseractCli::new(config.tesseract_cmd.as_deref()));
        Self::new(config, engine)
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    fn navigator<'a>(&'a self, driver: &'a dyn PageDriver) -> Navigator<'a> {
        Navigator::new(driver, &self.config, &self.solver)
    }

    /// Look a case up by CNR and save it as JSON.
    pub async fn search_by_cnr(&self, driver: &dyn PageDriver, cnr: &str) -> Option<CaseRecord> {
        let html = self.navigator(driver).search_by_cnr(cnr).await?;
        let record = parse_case_details(&html, cnr).into_record("case details")?;

        match self.store.save_json(&record, &case_filename(cnr, Local::now())) {
            Ok(path) => info!("case info saved to {}", path.display()),
            Err(e) => warn!("case info not saved: {}", e),
        }
        Some(record)
    }

    pub async fn check_case_listed(
        &self,
        driver: &dyn PageDriver,
        cnr: &str,
        date: &str,
    ) -> Option<ListingCheck> {
        info!("checking if case {} is listed on {}", cnr, date);
        let record = self.search_by_cnr(driver, cnr).await?;
        Some(ListingCheck::evaluate(record, date))
    }

    pub async fn check_case_today(&self, driver: &dyn PageDriver, cnr: &str) -> Option<ListingCheck> {
        self.check_case_listed(driver, cnr, &dates::today()).await
    }

    pub async fn check_case_tomorrow(
        &self,
        driver: &dyn PageDriver,
        cnr: &str,
    ) -> Option<ListingCheck> {
        self.check_case_listed(driver, cnr, &dates::tomorrow()).await
    }

    /// Retrieve one court's cause list; today when the request has no date.
    pub async fn download_cause_list(
        &self,
        driver: &dyn PageDriver,
        request: &CauseListRequest,
    ) -> Option<CauseListOutcome> {
        let date = request
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(dates::format_date)
            .unwrap_or_else(dates::today);
        let submission = self.navigator(driver).submit_cause_list(request, &date).await?;
        finish_cause_list(submission, request, &date, &self.store, parse_cause_list)
    }

    /// Every court in the complex, one after another. Courts that fail are
    /// skipped.
    pub async fn download_all_cause_lists(
        &self,
        driver: &dyn PageDriver,
        request: &CauseListRequest,
    ) -> Vec<CauseListOutcome> {
        let Some(courts) = self.navigator(driver).list_court_names(request).await else {
            return Vec::new();
        };
        let mut outcomes = Vec::with_capacity(courts.len());
        for court in courts {
            let per_court = CauseListRequest {
                court_name: Some(court.clone()),
                ..request.clone()
            };
            match self.download_cause_list(driver, &per_court).await {
                Some(outcome) => outcomes.push(outcome),
                None => warn!("no cause list for court {}", court),
            }
        }
        outcomes
    }
}
