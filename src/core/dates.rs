//! `DD-MM-YYYY` date helpers shared by the CLI, the HTTP front-end and the
//! navigation flows.

use chrono::{Datelike, Duration, Local, NaiveDate};

pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Re-render `input` as `DD-MM-YYYY`.
///
/// Already well-formed dates come back unchanged; anything unparsable is
/// returned as-is instead of failing.
pub fn format_date(input: &str) -> String {
    format_date_with(input, DATE_FORMAT, DATE_FORMAT)
}

pub fn format_date_with(input: &str, input_format: &str, output_format: &str) -> String {
    match NaiveDate::parse_from_str(input, input_format) {
        Ok(date) if has_full_year(input, input_format, &date) => {
            date.format(output_format).to_string()
        }
        _ => input.to_string(),
    }
}

/// chrono's `%Y` also takes one to three digits; insist on four.
fn has_full_year(input: &str, input_format: &str, date: &NaiveDate) -> bool {
    !input_format.contains("%Y") || input.contains(&format!("{:04}", date.year()))
}

pub fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn tomorrow() -> String {
    (Local::now().date_naive() + Duration::days(1))
        .format(DATE_FORMAT)
        .to_string()
}

/// `21-10-2025` → `21102025`, used in generated file names.
pub fn compact(date: &str) -> String {
    date.replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_date_is_unchanged() {
        assert_eq!(format_date("20-10-2025"), "20-10-2025");
        let once = format_date("20-10-2025");
        assert_eq!(format_date(&once), once);
    }

    #[test]
    fn unparsable_input_is_returned_verbatim() {
        assert_eq!(format_date("next tuesday"), "next tuesday");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("2025-10-20"), "2025-10-20");
        assert_eq!(format_date("20-10-25"), "20-10-25");
        assert_eq!(format_date("1-1-202"), "1-1-202");
    }

    #[test]
    fn single_digit_day_and_month_are_padded() {
        assert_eq!(format_date("1-2-2025"), "01-02-2025");
    }

    #[test]
    fn converts_between_formats() {
        assert_eq!(
            format_date_with("2025-10-20", "%Y-%m-%d", DATE_FORMAT),
            "20-10-2025"
        );
    }

    #[test]
    fn tomorrow_follows_today() {
        let t = NaiveDate::parse_from_str(&today(), DATE_FORMAT).unwrap();
        let n = NaiveDate::parse_from_str(&tomorrow(), DATE_FORMAT).unwrap();
        assert_eq!(n - t, Duration::days(1));
    }

    #[test]
    fn compact_drops_separators() {
        assert_eq!(compact("21-10-2025"), "21102025");
    }
}
