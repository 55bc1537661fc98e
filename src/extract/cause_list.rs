//! Cause list from the rendered results table.

use super::{cell_text, selector, Extraction};
use crate::core::types::{CauseList, CauseListEntry, ListType};
use scraper::{ElementRef, Html};

/// Fewer cells than this and a row is a section heading or spacer.
const MIN_ROW_CELLS: usize = 3;

/// What the caller already knows about the list being parsed.
#[derive(Debug, Clone, Default)]
pub struct CauseListMeta {
    pub date: String,
    pub state: String,
    pub district: String,
    pub court_complex: String,
    pub court_name: String,
    pub judge_name: Option<String>,
    pub list_type: ListType,
}

/// Parse the first table that looks like a docket.
///
/// Row 0 is the header. Columns: serial, case number, petitioner,
/// respondent, advocate; trailing columns are optional.
pub fn parse_cause_list(html: &str, meta: &CauseListMeta) -> Extraction<CauseList> {
    let doc = Html::parse_document(html);
    let Some(table) = primary_table(&doc) else {
        return Extraction::absent("no cause-list table on page");
    };

    let entries: Vec<CauseListEntry> = row_cells(&table)
        .into_iter()
        .skip(1)
        .filter(|cells| cells.len() >= MIN_ROW_CELLS)
        .map(|cells| {
            let case_number = cells[1].clone();
            CauseListEntry {
                serial_number: cells[0].clone(),
                case_type: case_type_of(&case_number),
                case_number,
                petitioner: non_empty(cells.get(2)),
                respondent: non_empty(cells.get(3)),
                advocate: non_empty(cells.get(4)),
            }
        })
        .collect();

    let list = CauseList {
        date: meta.date.clone(),
        state: meta.state.clone(),
        district: meta.district.clone(),
        court_complex: meta.court_complex.clone(),
        court_name: meta.court_name.clone(),
        judge_name: meta.judge_name.clone(),
        list_type: meta.list_type,
        entries,
    };

    let mut missing = Vec::new();
    if list.court_name.trim().is_empty() {
        missing.push("court_name");
    }
    Extraction::from_parts(list, missing)
}

fn primary_table(doc: &Html) -> Option<ElementRef<'_>> {
    let sel = selector("table")?;
    doc.select(&sel)
        .find(|t| row_cells(t).iter().any(|cells| cells.len() >= MIN_ROW_CELLS))
}

fn row_cells(table: &ElementRef<'_>) -> Vec<Vec<String>> {
    let (Some(tr), Some(td)) = (selector("tr"), selector("td")) else {
        return Vec::new();
    };
    table
        .select(&tr)
        .map(|row| row.select(&td).map(|c| cell_text(&c)).collect())
        .collect()
}

fn non_empty(cell: Option<&String>) -> Option<String> {
    cell.filter(|s| !s.is_empty()).cloned()
}

/// `"OS/567/2023"` → `"OS"`.
fn case_type_of(case_number: &str) -> Option<String> {
    let (prefix, _) = case_number.split_once('/')?;
    let prefix = prefix.trim();
    (!prefix.is_empty() && prefix.chars().any(|c| c.is_ascii_alphabetic()))
        .then(|| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(court: &str) -> CauseListMeta {
        CauseListMeta {
            date: "21-10-2025".into(),
            state: "Karnataka".into(),
            district: "Bangalore".into(),
            court_complex: "City Civil Court".into(),
            court_name: court.into(),
            ..Default::default()
        }
    }

    const TABLE: &str = r#"<html><body>
        <table><tr><td>Court Hall 1</td></tr></table>
        <table>
          <tr><td>Sr No</td><td>Case Number</td><td>Petitioner</td><td>Respondent</td><td>Advocate</td></tr>
          <tr><td>1</td><td>OS/10/2024</td><td>A</td><td>B</td><td>Adv X</td></tr>
          <tr><td>2</td><td>MA/11/2024</td><td>C</td><td>D</td></tr>
          <tr><td colspan="2">Evidence</td><td></td></tr>
          <tr><td>3</td><td>12/2024</td><td>E</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn data_rows_keep_table_order() {
        let out = parse_cause_list(TABLE, &meta("Court Hall 1"));
        let Extraction::Complete(list) = out else {
            panic!("expected a complete extraction");
        };
        let serials: Vec<&str> = list.entries.iter().map(|e| e.serial_number.as_str()).collect();
        assert_eq!(serials, vec!["1", "2", "3"]);
        assert_eq!(list.entries[0].advocate.as_deref(), Some("Adv X"));
        assert_eq!(list.entries[0].case_type.as_deref(), Some("OS"));
        assert_eq!(list.entries[1].advocate, None);
        assert_eq!(list.entries[2].respondent, None);
        assert_eq!(list.entries[2].case_type, None);
    }

    #[test]
    fn blank_court_name_is_partial() {
        let out = parse_cause_list(TABLE, &meta(""));
        assert_eq!(out.missing(), &["court_name"]);
        assert_eq!(out.record().map(|l| l.total_cases()), Some(3));
    }

    #[test]
    fn no_table_is_absent() {
        assert!(parse_cause_list("<p>No records</p>", &meta("X")).is_absent());
    }
}
