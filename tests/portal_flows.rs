//! Portal flows end to end against a scripted page and OCR engine.

use async_trait::async_trait;
use ecourts_scraper::captcha::verification::{AttemptOutcome, RejectReason};
use ecourts_scraper::captcha::{
    solve_challenge, CaptchaSolver, CharsetPolicy, OcrError, TextRecognizer, VerificationConfig,
};
use ecourts_scraper::scraping::driver::DriverError;
use ecourts_scraper::scraping::locator::Locator;
use ecourts_scraper::scraping::navigation::challenge_locators;
use ecourts_scraper::{
    CauseListOutcome, CauseListRequest, EcourtsScraper, ListType, PageDriver, ScraperConfig,
};
use image::GrayImage;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CAPTCHA_IMAGE: &str = "img[id*='captcha' i]";
const CAPTCHA_INPUT: &str = "input[placeholder='Enter Captcha']";
const CAPTCHA_REFRESH: &str = "a[onclick*='captcha' i]";
const CNR_TAB: &str = "a:has-text('CNR Number')";
const CNR_INPUT: &str = "#cino";
const SEARCH: &str = "button:has-text('Search')";
const STATE: &str = "select[name*='state' i]";
const DISTRICT: &str = "select[name*='district' i]";
const COMPLEX: &str = "select[name*='complex' i]";
const COURT: &str = "select[id*='court_name' i]";
const DATE: &str = "input[type='text'][name*='date' i]";
const SUBMIT_CIVIL: &str = "input[value*='Civil' i]";

const CNR: &str = "KABC010012342023";

const CASE_PAGE: &str = r#"<html><body>
    <table class="case_details_table">
      <tr><td>Case Type</td><td>O.S. - Original Suit</td></tr>
      <tr><td>Filing Number</td><td>1234/2023</td><td>Filing Date</td><td>02-03-2023</td></tr>
      <tr><td>Registration Number</td><td>OS/567/2023</td><td>Registration Date:</td><td>05-03-2023</td></tr>
    </table>
    <table class="case_status_table">
      <tr><td>Next Hearing Date</td><td>21-10-2025</td></tr>
      <tr><td>Case Stage</td><td>Evidence</td></tr>
      <tr><td>Court Number and Judge</td><td>3-Principal Civil Judge</td></tr>
    </table>
    <table class="Petitioner_Advocate_table"><tr><td>1) Ramesh Kumar</td></tr></table>
    <table class="Respondent_Advocate_table"><tr><td>1) Suresh</td></tr></table>
</body></html>"#;

const CAUSE_LIST_PAGE: &str = r#"<html><body>
    <table>
      <tr><td>Sr No</td><td>Case Number</td><td>Petitioner</td><td>Respondent</td><td>Advocate</td></tr>
      <tr><td>1</td><td>OS/12/2024</td><td>Anil</td><td>Bharat</td><td>K Rao</td></tr>
      <tr><td colspan="5">Evidence</td></tr>
      <tr><td>2</td><td>1450/2022</td><td>State</td><td>Chetan</td></tr>
    </table>
</body></html>"#;

/// Page whose elements exist when their rendered locator is listed.
#[derive(Default)]
struct ScriptedPage {
    present: HashSet<String>,
    html: String,
    court_options: Vec<String>,
    download: Mutex<Option<Vec<u8>>>,
    actions: Mutex<Vec<String>>,
}

impl ScriptedPage {
    fn with(elements: &[&str]) -> Self {
        Self {
            present: elements.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.actions().iter().filter(|a| a.starts_with(prefix)).count()
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(self.present.contains(&locator.to_string()))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.record(format!("click {}", locator));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.record(format!("fill {}={}", locator, value));
        Ok(())
    }

    async fn select_by_label(&self, locator: &Locator, label: &str) -> Result<bool, DriverError> {
        self.record(format!("select {}={}", locator, label));
        Ok(true)
    }

    async fn select_first_option(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        self.record(format!("select-first {}", locator));
        Ok(self.court_options.first().cloned())
    }

    async fn option_labels(&self, _locator: &Locator) -> Result<Vec<String>, DriverError> {
        Ok(self.court_options.clone())
    }

    async fn capture_element(&self, _locator: &Locator) -> Result<Vec<u8>, DriverError> {
        Ok(b"not really a png".to_vec())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.html.clone())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) {}

    async fn take_download(&self, _timeout: Duration) -> Result<Option<Vec<u8>>, DriverError> {
        Ok(self.download.lock().unwrap().take())
    }

    async fn save_snapshot(&self, path: &Path) -> Result<(), DriverError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"png")?;
        Ok(())
    }
}

/// Hands out queued readings, then empty text.
#[derive(Default)]
struct ScriptedOcr {
    readings: Mutex<VecDeque<&'static str>>,
}

impl ScriptedOcr {
    fn reading(readings: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            readings: Mutex::new(readings.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl TextRecognizer for ScriptedOcr {
    async fn read_line(&self, _: &GrayImage, _: CharsetPolicy) -> Result<String, OcrError> {
        Ok(self
            .readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
            .to_string())
    }
}

fn quick_config(root: &Path) -> ScraperConfig {
    ScraperConfig {
        wait_timeout_ms: 30,
        captcha_image_timeout_ms: 30,
        captcha_refresh_pause_ms: 0,
        max_captcha_retries: 3,
        settle_delay_ms: 0,
        request_delay_ms: 0,
        download_wait_ms: 0,
        network_idle_timeout_ms: 0,
        output_dir: root.join("output"),
        diagnostics_dir: root.join("diagnostics"),
        ..Default::default()
    }
}

fn quick_verification() -> VerificationConfig {
    VerificationConfig {
        max_attempts: 3,
        image_timeout: Duration::from_millis(30),
        refresh_pause: Duration::ZERO,
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default()
}

fn cause_request(court_name: Option<&str>) -> CauseListRequest {
    CauseListRequest {
        state: "Karnataka".into(),
        district: "Bangalore".into(),
        court_complex: "City Civil Court".into(),
        court_name: court_name.map(str::to_string),
        date: Some("21-10-2025".into()),
        list_type: ListType::Civil,
    }
}

fn cause_list_page(court_options: &[&str]) -> ScriptedPage {
    ScriptedPage {
        court_options: court_options.iter().map(|c| c.to_string()).collect(),
        ..ScriptedPage::with(&[
            STATE,
            DISTRICT,
            COMPLEX,
            COURT,
            DATE,
            SUBMIT_CIVIL,
            CAPTCHA_IMAGE,
            CAPTCHA_INPUT,
        ])
    }
}

// ── Verification loop ───────────────────────────────────────────────────────

#[tokio::test]
async fn exhausted_verification_logs_every_attempt() {
    let page = ScriptedPage::with(&[CAPTCHA_IMAGE, CAPTCHA_INPUT, CAPTCHA_REFRESH]);
    let solver = CaptchaSolver::new(ScriptedOcr::reading(&[]));

    let report = solve_challenge(&page, &solver, &challenge_locators(), &quick_verification()).await;

    assert!(!report.solved());
    assert_eq!(report.code(), None);
    let indexes: Vec<u32> = report.attempts.iter().map(|a| a.index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::Rejected(RejectReason::Unreadable)));
    // refreshed between attempts, not after the last one
    assert_eq!(page.count("click "), 2);
    assert_eq!(page.count("fill "), 0);
}

#[tokio::test]
async fn second_reading_is_typed_in() {
    let page = ScriptedPage::with(&[CAPTCHA_IMAGE, CAPTCHA_INPUT, CAPTCHA_REFRESH]);
    // attempt 1: both policies misread; attempt 2: first policy reads
    let solver = CaptchaSolver::new(ScriptedOcr::reading(&["?", "", "AB 12"]));

    let report = solve_challenge(&page, &solver, &challenge_locators(), &quick_verification()).await;

    assert!(report.solved());
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.code(), Some("AB12"));
    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::Rejected(RejectReason::Unreadable)
    );
    assert_eq!(page.actions(), vec![
        format!("click {}", CAPTCHA_REFRESH),
        format!("fill {}=AB12", CAPTCHA_INPUT),
    ]);
}

#[tokio::test]
async fn missing_image_rejects_each_attempt() {
    let page = ScriptedPage::with(&[CAPTCHA_INPUT]);
    let solver = CaptchaSolver::new(ScriptedOcr::reading(&["AB12"]));

    let report = solve_challenge(&page, &solver, &challenge_locators(), &quick_verification()).await;

    assert_eq!(report.attempts.len(), 3);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::Rejected(RejectReason::ImageNotFound)
            && a.image.is_empty()));
}

// ── CNR lookup ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn cnr_search_reads_and_saves_the_case() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(quick_config(dir.path()));
    let scraper = EcourtsScraper::new(config.clone(), ScriptedOcr::reading(&["AB12"]));
    let page = ScriptedPage {
        html: CASE_PAGE.to_string(),
        ..ScriptedPage::with(&[CNR_TAB, CNR_INPUT, SEARCH, CAPTCHA_IMAGE, CAPTCHA_INPUT])
    };

    let record = scraper.search_by_cnr(&page, CNR).await.unwrap();

    assert_eq!(record.cnr, CNR);
    assert_eq!(record.case_number.as_deref(), Some("OS/567/2023"));
    assert_eq!(record.next_hearing.as_deref(), Some("21-10-2025"));
    assert_eq!(record.judge_name.as_deref(), Some("Principal Civil Judge"));

    let actions = page.actions();
    let fill_cnr = format!("fill {}={}", CNR_INPUT, CNR);
    let fill_code = format!("fill {}=AB12", CAPTCHA_INPUT);
    let submit = format!("click {}", SEARCH);
    let pos = |a: &String| actions.iter().position(|x| x == a).unwrap();
    assert!(pos(&format!("click {}", CNR_TAB)) < pos(&fill_cnr));
    assert!(pos(&fill_cnr) < pos(&fill_code));
    assert!(pos(&fill_code) < pos(&submit));

    let saved = files_in(&scraper.store().json_dir());
    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with(&format!("case_{}_", CNR)));
    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&saved[0]).unwrap()).unwrap();
    assert_eq!(json["cnr"], CNR);
}

#[tokio::test]
async fn listing_check_matches_next_hearing() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = EcourtsScraper::new(
        Arc::new(quick_config(dir.path())),
        ScriptedOcr::reading(&["AB12", "AB12"]),
    );
    let page = ScriptedPage {
        html: CASE_PAGE.to_string(),
        ..ScriptedPage::with(&[CNR_TAB, CNR_INPUT, SEARCH, CAPTCHA_IMAGE, CAPTCHA_INPUT])
    };

    let listed = scraper.check_case_listed(&page, CNR, "21-10-2025").await.unwrap();
    assert!(listed.is_listed);
    assert_eq!(listed.date_checked, "21-10-2025");

    let other = scraper.check_case_listed(&page, CNR, "22-10-2025").await.unwrap();
    assert!(!other.is_listed);
}

#[tokio::test]
async fn missing_cnr_tab_leaves_named_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(quick_config(dir.path()));
    let scraper = EcourtsScraper::new(config.clone(), ScriptedOcr::reading(&["AB12"]));
    let page = ScriptedPage::with(&[CNR_INPUT, SEARCH]);

    assert!(scraper.search_by_cnr(&page, CNR).await.is_none());
    assert!(config.diagnostics_dir.join("cnr_button_not_found.png").exists());
    assert!(files_in(&scraper.store().json_dir()).is_empty());
}

#[tokio::test]
async fn unsolved_verification_never_submits_search() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = EcourtsScraper::new(Arc::new(quick_config(dir.path())), ScriptedOcr::reading(&[]));
    let page = ScriptedPage {
        html: CASE_PAGE.to_string(),
        ..ScriptedPage::with(&[CNR_TAB, CNR_INPUT, SEARCH, CAPTCHA_IMAGE, CAPTCHA_INPUT])
    };

    assert!(scraper.search_by_cnr(&page, CNR).await.is_none());
    assert_eq!(page.count(&format!("click {}", SEARCH)), 0);
}

// ── Cause lists ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_response_is_stored_as_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(quick_config(dir.path()));
    let scraper = EcourtsScraper::new(config.clone(), ScriptedOcr::reading(&["AB12"]));
    let page = cause_list_page(&["Court A", "Court B"]);
    *page.download.lock().unwrap() = Some(b"%PDF-1.4 cause list".to_vec());

    let outcome = scraper
        .download_cause_list(&page, &cause_request(None))
        .await
        .unwrap();

    let CauseListOutcome::Document { path } = outcome else {
        panic!("expected a document outcome");
    };
    assert_eq!(
        path,
        scraper.store().pdf_dir().join("causelist_Karnataka_Bangalore_Court A_21102025_Civil.pdf")
    );
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 cause list");
    assert_eq!(page.count(&format!("select-first {}", COURT)), 1);
    assert!(page
        .actions()
        .contains(&format!("fill {}=21-10-2025", DATE)));
}

#[tokio::test]
async fn rendered_list_is_parsed_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(quick_config(dir.path()));
    let scraper = EcourtsScraper::new(config.clone(), ScriptedOcr::reading(&["AB12"]));
    let page = ScriptedPage {
        html: CAUSE_LIST_PAGE.to_string(),
        ..cause_list_page(&["Court A"])
    };

    let outcome = scraper
        .download_cause_list(&page, &cause_request(None))
        .await
        .unwrap();

    let CauseListOutcome::Parsed { path, cause_list } = outcome else {
        panic!("expected a parsed outcome");
    };
    assert_eq!(cause_list.court_name, "Court A");
    assert_eq!(cause_list.total_cases(), 2);
    assert_eq!(cause_list.entries[0].case_type.as_deref(), Some("OS"));
    assert_eq!(cause_list.entries[1].case_type, None);
    assert_eq!(cause_list.entries[1].advocate, None);

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["total_cases"], 2);
    assert_eq!(json["list_type"], "Civil");
}

#[tokio::test]
async fn every_court_is_requested_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = EcourtsScraper::new(
        Arc::new(quick_config(dir.path())),
        ScriptedOcr::reading(&["AB12", "CD34"]),
    );
    let page = ScriptedPage {
        html: CAUSE_LIST_PAGE.to_string(),
        ..cause_list_page(&["Court A", "Court B"])
    };

    let outcomes = scraper
        .download_all_cause_lists(&page, &cause_request(None))
        .await;

    assert_eq!(outcomes.len(), 2);
    let saved = files_in(&scraper.store().json_dir());
    assert_eq!(saved.len(), 2);
    for (outcome, court) in outcomes.iter().zip(["Court A", "Court B"]) {
        let name = outcome.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("causelist_Karnataka_Bangalore_{}_21102025_Civil.json", court));
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(outcome.path()).unwrap()).unwrap();
        assert_eq!(json["court_name"], court);
    }
    let actions = page.actions();
    assert!(actions.contains(&format!("select {}=Court A", COURT)));
    assert!(actions.contains(&format!("select {}=Court B", COURT)));
    assert_eq!(page.count("select-first "), 0);
}

#[tokio::test]
async fn missing_state_select_stops_the_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(quick_config(dir.path()));
    let scraper = EcourtsScraper::new(config.clone(), ScriptedOcr::reading(&["AB12"]));
    let page = ScriptedPage::with(&[DISTRICT, COMPLEX, COURT]);

    assert!(scraper
        .download_cause_list(&page, &cause_request(Some("Court A")))
        .await
        .is_none());
    assert!(config.diagnostics_dir.join("state_select_not_found.png").exists());
    assert!(files_in(&scraper.store().pdf_dir()).is_empty());
}
