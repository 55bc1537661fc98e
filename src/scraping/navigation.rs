//! Portal form flows: CNR lookup and cause-list submission.
//!
//! Flows return the raw result (page HTML or document bytes) and leave
//! parsing to [`crate::extract`]. Any step that times out takes a named
//! snapshot and ends the flow with `None`.

use super::driver::{DriverError, PageDriver};
use super::locator::{LocateError, Locator, LocatorChain};
use crate::captcha::{solve_challenge, CaptchaSolver, ChallengeLocators, VerificationConfig};
use crate::core::config::ScraperConfig;
use crate::core::types::{CauseListRequest, ListType};
use crate::features::diagnostics::{self, Diagnostics};
use thiserror::Error;
use tracing::{error, info, warn};

// ── Site locators ────────────────────────────────────────────────────────────

pub fn challenge_locators() -> ChallengeLocators {
    ChallengeLocators {
        image: LocatorChain::new("captcha image")
            .or_attr_contains("img", &["id", "src"], "captcha"),
        input: LocatorChain::new("captcha input")
            .or_css("input[placeholder='Enter Captcha']")
            .or_attr_contains("input", &["id", "name", "placeholder"], "captcha"),
        refresh: LocatorChain::new("captcha refresh")
            .or_attr_contains("a", &["onclick"], "captcha")
            .or_attr_contains("button", &["onclick"], "captcha")
            .or_attr_contains("img", &["onclick"], "refresh"),
    }
}

fn cnr_tab() -> LocatorChain {
    LocatorChain::new("CNR Number tab")
        .or_text("a", "CNR Number")
        .or_text("button", "CNR Number")
        .or_text("li", "CNR Number")
        .or_text("span", "CNR Number")
}

fn cnr_input() -> LocatorChain {
    LocatorChain::new("CNR input")
        .or_css("#cino")
        .or_attr_contains("input", &["name", "id"], "cino")
        .or_attr_contains("input", &["placeholder"], "CNR")
}

fn search_button() -> LocatorChain {
    LocatorChain::new("search button")
        .or_text("button", "Search")
        .or_attr_contains("input", &["value"], "Search")
}

fn state_select() -> LocatorChain {
    LocatorChain::new("state select").or_attr_contains("select", &["name", "id"], "state")
}

fn district_select() -> LocatorChain {
    LocatorChain::new("district select").or_attr_contains("select", &["name", "id"], "district")
}

fn complex_select() -> LocatorChain {
    LocatorChain::new("court complex select").or_attr_contains("select", &["name", "id"], "complex")
}

fn court_select() -> LocatorChain {
    LocatorChain::new("court name select")
        .or_attr_contains("select", &["id", "name"], "court_name")
        .or_css("select[name*='court' i]:not([name*='complex' i])")
}

fn date_input() -> LocatorChain {
    LocatorChain::new("date input")
        .or_css("input[type='text'][name*='date' i]")
        .or_attr_contains("input", &["id"], "date")
}

fn submit_button(list_type: ListType) -> LocatorChain {
    let label = list_type.as_str();
    LocatorChain::new("cause list submit")
        .or_attr_contains("input", &["value"], label)
        .or_text("button", label)
}

// ── Flow plumbing ────────────────────────────────────────────────────────────

/// Why a flow stopped, and which snapshot documents it.
#[derive(Debug, Error)]
enum FlowError {
    #[error("{source}")]
    Locate {
        snapshot: &'static str,
        #[source]
        source: LocateError,
    },

    #[error("{what}: {source}")]
    Driver {
        what: &'static str,
        snapshot: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("no option labelled '{label}' in {field}")]
    NoSuchOption {
        field: &'static str,
        label: String,
        snapshot: &'static str,
    },

    #[error("{element} not found")]
    Missing {
        element: &'static str,
        snapshot: &'static str,
    },

    #[error("verification failed")]
    Verification,
}

impl FlowError {
    fn snapshot(&self) -> Option<&'static str> {
        match self {
            FlowError::Locate { snapshot, .. }
            | FlowError::Driver { snapshot, .. }
            | FlowError::NoSuchOption { snapshot, .. }
            | FlowError::Missing { snapshot, .. } => Some(*snapshot),
            FlowError::Verification => None,
        }
    }
}

trait FlowResultExt<T> {
    fn on_fail(self, what: &'static str, snapshot: &'static str) -> Result<T, FlowError>;
}

impl<T> FlowResultExt<T> for Result<T, DriverError> {
    fn on_fail(self, what: &'static str, snapshot: &'static str) -> Result<T, FlowError> {
        self.map_err(|source| FlowError::Driver {
            what,
            snapshot,
            source,
        })
    }
}

/// What the portal handed back after a cause-list submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// A document went to the download manager; HTML must not be parsed.
    Document(Vec<u8>),
    /// The list was rendered in the page.
    Page(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CauseListSubmission {
    /// Court actually selected; the first listed court when none was requested.
    pub court_name: String,
    pub result: SubmissionResult,
}

pub fn verification_config(cfg: &ScraperConfig) -> VerificationConfig {
    VerificationConfig {
        max_attempts: cfg.max_captcha_retries,
        image_timeout: std::time::Duration::from_millis(cfg.captcha_image_timeout_ms),
        refresh_pause: std::time::Duration::from_millis(cfg.captcha_refresh_pause_ms),
    }
}

/// Drives one page through the portal's forms.
pub struct Navigator<'a> {
    driver: &'a dyn PageDriver,
    config: &'a ScraperConfig,
    solver: &'a CaptchaSolver,
    diagnostics: Diagnostics,
}

impl<'a> Navigator<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a ScraperConfig, solver: &'a CaptchaSolver) -> Self {
        Self {
            driver,
            config,
            solver,
            diagnostics: Diagnostics::new(&config.diagnostics_dir),
        }
    }

    async fn fail(&self, flow: &str, err: FlowError) {
        error!("{}: {}", flow, err);
        if let Some(name) = err.snapshot() {
            self.diagnostics.capture(self.driver, name).await;
        }
    }

    async fn find(&self, chain: LocatorChain, snapshot: &'static str) -> Result<Locator, FlowError> {
        chain
            .wait(self.driver, self.config.wait_timeout())
            .await
            .map_err(|source| FlowError::Locate { snapshot, source })
    }

    async fn verify(&self) -> Result<(), FlowError> {
        let report = solve_challenge(
            self.driver,
            self.solver,
            &challenge_locators(),
            &verification_config(self.config),
        )
        .await;
        if report.solved() {
            Ok(())
        } else {
            Err(FlowError::Verification)
        }
    }

    // ── CNR lookup ───────────────────────────────────────────────────────────

    /// Run a CNR search and return the result page HTML.
    pub async fn search_by_cnr(&self, cnr: &str) -> Option<String> {
        info!("searching case with CNR: {}", cnr);
        match self.cnr_flow(cnr).await {
            Ok(html) => Some(html),
            Err(e) => {
                self.fail("CNR search", e).await;
                None
            }
        }
    }

    async fn cnr_flow(&self, cnr: &str) -> Result<String, FlowError> {
        let d = self.driver;
        d.goto(&self.config.cnr_search_url())
            .await
            .on_fail("open search page", diagnostics::ERROR_SEARCHING_BY_CNR)?;

        let tab = self.find(cnr_tab(), diagnostics::CNR_BUTTON_NOT_FOUND).await?;
        d.click(&tab)
            .await
            .on_fail("open CNR tab", diagnostics::CNR_BUTTON_NOT_FOUND)?;

        let input = self.find(cnr_input(), diagnostics::CNR_INPUT_NOT_FOUND).await?;
        d.fill(&input, cnr)
            .await
            .on_fail("fill CNR", diagnostics::CNR_INPUT_NOT_FOUND)?;

        self.verify().await?;

        let Some(search) = search_button().first_present(d).await else {
            return Err(FlowError::Missing {
                element: "search button",
                snapshot: diagnostics::SEARCH_BUTTON_NOT_FOUND,
            });
        };
        d.click(&search)
            .await
            .on_fail("submit search", diagnostics::SEARCH_BUTTON_NOT_FOUND)?;
        d.wait_for_network_idle(self.config.network_idle_timeout()).await;

        d.content()
            .await
            .on_fail("read result page", diagnostics::ERROR_SEARCHING_BY_CNR)
    }

    // ── Cause lists ──────────────────────────────────────────────────────────

    /// Fill the cause-list form for `request` on `date` and submit it.
    pub async fn submit_cause_list(
        &self,
        request: &CauseListRequest,
        date: &str,
    ) -> Option<CauseListSubmission> {
        info!(
            "requesting cause list for {}/{}/{} on {}",
            request.state, request.district, request.court_complex, date
        );
        match self.cause_list_flow(request, date).await {
            Ok(submission) => Some(submission),
            Err(e) => {
                self.fail("cause list", e).await;
                None
            }
        }
    }

    /// Court names offered for a state/district/complex.
    pub async fn list_court_names(&self, request: &CauseListRequest) -> Option<Vec<String>> {
        let result = async {
            self.open_cause_list_form(request).await?;
            let court = self.find(court_select(), diagnostics::COURT_SELECT_NOT_FOUND).await?;
            self.driver
                .option_labels(&court)
                .await
                .on_fail("read court names", diagnostics::COURT_SELECT_NOT_FOUND)
        }
        .await;
        match result {
            Ok(names) => {
                info!("{} courts in {}", names.len(), request.court_complex);
                Some(names)
            }
            Err(e) => {
                self.fail("court listing", e).await;
                None
            }
        }
    }

    async fn select_label(
        &self,
        chain: LocatorChain,
        label: &str,
        snapshot: &'static str,
    ) -> Result<(), FlowError> {
        let field = chain.name();
        let at = self.find(chain, snapshot).await?;
        let selected = self
            .driver
            .select_by_label(&at, label)
            .await
            .on_fail("select option", snapshot)?;
        if !selected {
            return Err(FlowError::NoSuchOption {
                field,
                label: label.to_string(),
                snapshot,
            });
        }
        tokio::time::sleep(self.config.settle_delay()).await;
        Ok(())
    }

    /// Open the form and settle state → district → complex.
    async fn open_cause_list_form(&self, request: &CauseListRequest) -> Result<(), FlowError> {
        self.driver
            .goto(&self.config.cause_list_url())
            .await
            .on_fail("open cause list page", diagnostics::ERROR_DOWNLOADING_CAUSELIST)?;
        tokio::time::sleep(self.config.request_delay()).await;

        self.select_label(state_select(), &request.state, diagnostics::STATE_SELECT_NOT_FOUND)
            .await?;
        self.select_label(
            district_select(),
            &request.district,
            diagnostics::DISTRICT_SELECT_NOT_FOUND,
        )
        .await?;
        self.select_label(
            complex_select(),
            &request.court_complex,
            diagnostics::COMPLEX_SELECT_NOT_FOUND,
        )
        .await
    }

    async fn cause_list_flow(
        &self,
        request: &CauseListRequest,
        date: &str,
    ) -> Result<CauseListSubmission, FlowError> {
        let d = self.driver;
        self.open_cause_list_form(request).await?;

        let court_name = match request.court_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => {
                self.select_label(court_select(), name, diagnostics::COURT_SELECT_NOT_FOUND)
                    .await?;
                name.to_string()
            }
            None => {
                let at = self.find(court_select(), diagnostics::COURT_SELECT_NOT_FOUND).await?;
                let first = d
                    .select_first_option(&at)
                    .await
                    .on_fail("select first court", diagnostics::COURT_SELECT_NOT_FOUND)?;
                tokio::time::sleep(self.config.settle_delay()).await;
                match first {
                    Some(label) => {
                        info!("no court requested, using first listed: {}", label);
                        label
                    }
                    None => {
                        warn!("court list is empty");
                        String::new()
                    }
                }
            }
        };

        if let Some(at) = date_input().first_present(d).await {
            d.fill(&at, date)
                .await
                .on_fail("fill date", diagnostics::ERROR_DOWNLOADING_CAUSELIST)?;
        } else {
            warn!("no date field on cause list form, portal default applies");
        }

        self.verify().await?;

        let Some(submit) = submit_button(request.list_type).first_present(d).await else {
            return Err(FlowError::Missing {
                element: "cause list submit",
                snapshot: diagnostics::CAUSELIST_SUBMIT_NOT_FOUND,
            });
        };
        d.click(&submit)
            .await
            .on_fail("submit cause list", diagnostics::CAUSELIST_SUBMIT_NOT_FOUND)?;

        let download = d
            .take_download(self.config.download_wait())
            .await
            .on_fail("watch for download", diagnostics::ERROR_DOWNLOADING_CAUSELIST)?;
        let result = match download {
            Some(bytes) => {
                info!("cause list arrived as a document ({} bytes)", bytes.len());
                SubmissionResult::Document(bytes)
            }
            None => {
                info!("no document download, reading list from page");
                d.wait_for_network_idle(self.config.network_idle_timeout()).await;
                SubmissionResult::Page(
                    d.content()
                        .await
                        .on_fail("read cause list page", diagnostics::ERROR_DOWNLOADING_CAUSELIST)?,
                )
            }
        };
        Ok(CauseListSubmission { court_name, result })
    }
}
