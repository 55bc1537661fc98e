use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ───────────────────────────────────────────────────────────────────────────
// Case lookup
// ───────────────────────────────────────────────────────────────────────────

/// Case metadata read from the CNR result page.
///
/// Every field apart from `cnr` is best-effort: a missing table or row on the
/// remote page leaves the corresponding field `None`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CaseRecord {
    pub cnr: String,
    /// Registration number (e.g. `OS/1234/2023`).
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub filing_number: Option<String>,
    #[serde(default)]
    pub filing_date: Option<String>,
    #[serde(default)]
    pub registration_date: Option<String>,
    /// Procedural stage as published by the court ("Case Stage").
    #[serde(default)]
    pub status: Option<String>,
    /// "Court Number and Judge" cell, verbatim.
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub judge_name: Option<String>,
    #[serde(default)]
    pub petitioner: Option<String>,
    #[serde(default)]
    pub respondent: Option<String>,
    /// Hearing dates from the case history table, in page order.
    #[serde(default)]
    pub listed_on: Vec<String>,
    #[serde(default)]
    pub next_hearing: Option<String>,
}

impl CaseRecord {
    pub fn new(cnr: impl Into<String>) -> Self {
        Self {
            cnr: cnr.into(),
            ..Default::default()
        }
    }
}

/// Answer to "is this case listed on a given day?".
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ListingCheck {
    pub cnr: String,
    pub date_checked: String,
    pub is_listed: bool,
    pub case_info: CaseRecord,
}

impl ListingCheck {
    /// A case counts as listed when its next hearing mentions the checked date.
    pub fn evaluate(case_info: CaseRecord, date: &str) -> Self {
        let is_listed = case_info
            .next_hearing
            .as_deref()
            .map(|h| !date.is_empty() && h.contains(date))
            .unwrap_or(false);
        Self {
            cnr: case_info.cnr.clone(),
            date_checked: date.to_string(),
            is_listed,
            case_info,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Cause lists
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListType {
    #[default]
    Civil,
    Criminal,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Civil => "Civil",
            ListType::Criminal => "Criminal",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civil" => Ok(ListType::Civil),
            "criminal" => Ok(ListType::Criminal),
            other => Err(format!(
                "unknown list type '{}'. Allowed values: Civil, Criminal",
                other
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CauseListEntry {
    pub serial_number: String,
    pub case_number: String,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub petitioner: Option<String>,
    #[serde(default)]
    pub respondent: Option<String>,
    #[serde(default)]
    pub advocate: Option<String>,
}

/// A court's daily docket. `total_cases` only exists on the wire and is
/// always `entries.len()`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CauseList {
    pub date: String,
    pub state: String,
    pub district: String,
    pub court_complex: String,
    pub court_name: String,
    #[serde(default)]
    pub judge_name: Option<String>,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default)]
    pub entries: Vec<CauseListEntry>,
}

impl CauseList {
    pub fn total_cases(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Serialize)]
struct CauseListWire<'a> {
    date: &'a str,
    state: &'a str,
    district: &'a str,
    court_complex: &'a str,
    court_name: &'a str,
    judge_name: &'a Option<String>,
    list_type: ListType,
    total_cases: usize,
    entries: &'a [CauseListEntry],
}

impl Serialize for CauseList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CauseListWire {
            date: &self.date,
            state: &self.state,
            district: &self.district,
            court_complex: &self.court_complex,
            court_name: &self.court_name,
            judge_name: &self.judge_name,
            list_type: self.list_type,
            total_cases: self.total_cases(),
            entries: &self.entries,
        }
        .serialize(serializer)
    }
}

/// Parameters for one cause-list retrieval.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CauseListRequest {
    pub state: String,
    pub district: String,
    pub court_complex: String,
    #[serde(default)]
    pub court_name: Option<String>,
    /// `DD-MM-YYYY`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub list_type: ListType,
}

/// Where a cause-list retrieval ended up on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum CauseListOutcome {
    /// The portal answered with a document; it was stored byte-for-byte.
    Document { path: PathBuf },
    /// The portal rendered an HTML table that was parsed and saved as JSON.
    Parsed { path: PathBuf, cause_list: CauseList },
}

impl CauseListOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CauseListOutcome::Document { path } => path,
            CauseListOutcome::Parsed { path, .. } => path,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// HTTP front-end payloads
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchCnrRequest {
    #[serde(default)]
    pub cnr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckListingRequest {
    #[serde(default)]
    pub cnr: Option<String>,
    /// `today` (default) or `tomorrow`.
    #[serde(default, rename = "type")]
    pub check_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadCauseListRequest {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub court_complex: Option<String>,
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub list_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    pub file: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
