//! Case record from the CNR result page.
//!
//! The page is a handful of label/value tables. Each field is read on its
//! own; a missing table or row only blanks the fields it carries.

use super::{cell_text, selector, Extraction};
use crate::core::types::CaseRecord;
use scraper::{ElementRef, Html};

const DETAILS_TABLE: &str = "table.case_details_table";
const STATUS_TABLE: &str = "table.case_status_table";
const PETITIONER_TABLE: &str = "table.Petitioner_Advocate_table";
const RESPONDENT_TABLE: &str = "table.Respondent_Advocate_table";
const HISTORY_TABLE: &str = "table.history_table";

/// Hearing date column in the history table (Judge | Business on Date | Hearing Date | Purpose).
const HISTORY_HEARING_COL: usize = 2;

pub fn parse_case_details(html: &str, cnr: &str) -> Extraction<CaseRecord> {
    let doc = Html::parse_document(html);
    let mut record = CaseRecord::new(cnr);

    let details = first_table(&doc, DETAILS_TABLE);
    let status = first_table(&doc, STATUS_TABLE);
    let petitioner = first_table(&doc, PETITIONER_TABLE);
    let respondent = first_table(&doc, RESPONDENT_TABLE);

    if details.is_none() && status.is_none() && petitioner.is_none() && respondent.is_none() {
        return Extraction::absent("no case tables on page");
    }

    if let Some(table) = details {
        for cells in rows(&table) {
            let Some(label) = cells.first() else { continue };
            if label.contains("Case Type") {
                record.case_type = cell(&cells, 1);
            } else if label.contains("Filing Number") {
                record.filing_number = cell(&cells, 1);
                record.filing_date = cell(&cells, 3);
            } else if label.contains("Registration Number") {
                record.case_number = cell(&cells, 1);
                record.registration_date = cell(&cells, 3);
            }
        }
    }

    if let Some(table) = status {
        for cells in rows(&table) {
            let Some(label) = cells.first() else { continue };
            if label.contains("Next Hearing Date") {
                record.next_hearing = cell(&cells, 1);
            } else if label.contains("Case Stage") {
                record.status = cell(&cells, 1);
            } else if label.contains("Court Number and Judge") {
                record.court_name = cell(&cells, 1);
                record.judge_name = record.court_name.as_deref().and_then(judge_from_court);
            }
        }
    }

    record.petitioner = petitioner.map(|t| cell_text(&t)).filter(|s| !s.is_empty());
    record.respondent = respondent.map(|t| cell_text(&t)).filter(|s| !s.is_empty());

    if let Some(table) = first_table(&doc, HISTORY_TABLE) {
        record.listed_on = rows(&table)
            .into_iter()
            .filter_map(|cells| cell(&cells, HISTORY_HEARING_COL))
            .filter(|d| d.chars().any(|c| c.is_ascii_digit()))
            .collect();
    }

    let mut missing = Vec::new();
    for (name, present) in [
        ("case_type", record.case_type.is_some()),
        ("case_number", record.case_number.is_some()),
        ("registration_date", record.registration_date.is_some()),
        ("filing_number", record.filing_number.is_some()),
        ("filing_date", record.filing_date.is_some()),
        ("status", record.status.is_some()),
        ("next_hearing", record.next_hearing.is_some()),
        ("court_name", record.court_name.is_some()),
        ("petitioner", record.petitioner.is_some()),
        ("respondent", record.respondent.is_some()),
    ] {
        if !present {
            missing.push(name);
        }
    }
    Extraction::from_parts(record, missing)
}

fn first_table<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    doc.select(&sel).next()
}

/// Text of every `th`/`td` per row, rows with fewer than two cells dropped.
fn rows(table: &ElementRef<'_>) -> Vec<Vec<String>> {
    let (Some(tr), Some(td)) = (selector("tr"), selector("th, td")) else {
        return Vec::new();
    };
    table
        .select(&tr)
        .map(|row| row.select(&td).map(|c| cell_text(&c)).collect::<Vec<_>>())
        .filter(|cells| cells.len() > 1)
        .collect()
}

fn cell(cells: &[String], idx: usize) -> Option<String> {
    cells.get(idx).filter(|s| !s.is_empty()).cloned()
}

/// `"2-Additional District Judge"` → `"Additional District Judge"`.
fn judge_from_court(court: &str) -> Option<String> {
    let (prefix, rest) = court.split_once('-')?;
    if prefix.trim().is_empty() || !prefix.trim().chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let judge = rest.trim();
    (!judge.is_empty()).then(|| judge.to_string())
}
