//! HTML → record extraction.

pub mod case_details;
pub mod cause_list;

pub use case_details::parse_case_details;
pub use cause_list::{parse_cause_list, CauseListMeta};

use scraper::{ElementRef, Selector};
use tracing::warn;

/// Result of reading a record out of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Complete(T),
    /// Usable, but the named fields could not be found.
    Partial { record: T, missing: Vec<&'static str> },
    /// Nothing usable on the page.
    Absent { reason: String },
}

impl<T> Extraction<T> {
    /// `Complete` when nothing is missing, `Partial` otherwise.
    pub fn from_parts(record: T, missing: Vec<&'static str>) -> Self {
        if missing.is_empty() {
            Extraction::Complete(record)
        } else {
            Extraction::Partial { record, missing }
        }
    }

    pub fn absent(reason: impl Into<String>) -> Self {
        Extraction::Absent {
            reason: reason.into(),
        }
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            Extraction::Complete(r) | Extraction::Partial { record: r, .. } => Some(r),
            Extraction::Absent { .. } => None,
        }
    }

    pub fn missing(&self) -> &[&'static str] {
        match self {
            Extraction::Partial { missing, .. } => missing,
            _ => &[],
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Extraction::Absent { .. })
    }

    /// Collapse to the record, logging what was missing or why nothing came back.
    pub fn into_record(self, what: &str) -> Option<T> {
        match self {
            Extraction::Complete(r) => Some(r),
            Extraction::Partial { record, missing } => {
                warn!("{}: missing fields: {}", what, missing.join(", "));
                Some(record)
            }
            Extraction::Absent { reason } => {
                warn!("{}: nothing extracted ({})", what, reason);
                None
            }
        }
    }
}

pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-collapsed text of an element.
pub(crate) fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
