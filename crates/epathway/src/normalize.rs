use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;

use crate::types::DevelopmentApplication;

pub const NO_DESCRIPTION: &str = "No description provided";

const LODGED_DATE_FORMAT: &str = "%d/%m/%Y";
const FORM_DATE_FORMAT: &str = "%d/%m/%Y";

static RE_APPLICATION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("invalid regex: application number"));

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_description(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Application numbers start with digits, e.g. `10/2024/1`.
pub fn is_application_number(text: &str) -> bool {
    RE_APPLICATION_NUMBER.is_match(text.trim())
}

/// Parses a lodgement date as shown in the results grid (`3/01/2024`).
pub fn parse_lodged_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), LODGED_DATE_FORMAT).ok()
}

/// The inclusive date range searched on a run: `lookback_months` before
/// `run_date` up to `run_date`.
pub fn search_date_range(run_date: NaiveDate, lookback_months: u32) -> (NaiveDate, NaiveDate) {
    let from = run_date
        .checked_sub_months(Months::new(lookback_months))
        .unwrap_or(NaiveDate::MIN);
    (from, run_date)
}

pub fn format_form_date(date: NaiveDate) -> String {
    date.format(FORM_DATE_FORMAT).to_string()
}

/// Shapes extracted values into a stored record.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub scrape_date: NaiveDate,
    pub information_url: String,
    pub comment_url: Option<String>,
}

impl Normalizer {
    /// Returns `None` when the address is blank; such records are never stored.
    pub fn normalize(
        &self,
        council_reference: &str,
        received: Option<NaiveDate>,
        address: &str,
        description: &str,
    ) -> Option<DevelopmentApplication> {
        let address = normalize_whitespace(address);
        if address.is_empty() {
            return None;
        }

        let received_date = match received {
            Some(date) if date > self.scrape_date => {
                log::warn!(
                    "Application {} has received date {} after the scrape date; storing it empty",
                    council_reference,
                    date
                );
                None
            }
            other => other,
        };

        Some(DevelopmentApplication {
            council_reference: council_reference.trim().to_string(),
            address,
            description: normalize_description(description),
            information_url: self.information_url.clone(),
            comment_url: self.comment_url.clone(),
            scrape_date: self.scrape_date,
            received_date,
            on_notice_from: None,
            on_notice_to: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer {
            scrape_date: date(2024, 2, 1),
            information_url: "https://example.org/EnquiryLists.aspx".to_string(),
            comment_url: Some("mailto:council@example.org".to_string()),
        }
    }

    #[test]
    fn test_normalize_whitespace_collapses_runs() {
        assert_eq!(normalize_whitespace("12  Smith  St"), "12 Smith St");
        assert_eq!(
            normalize_whitespace("  12 Smith St\n\t Nuriootpa SA 5355 "),
            "12 Smith St Nuriootpa SA 5355"
        );
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_normalize_description_sentinel() {
        assert_eq!(normalize_description(""), NO_DESCRIPTION);
        assert_eq!(normalize_description("   "), NO_DESCRIPTION);
        assert_eq!(normalize_description("  Fence "), "Fence");
    }

    #[test]
    fn test_is_application_number() {
        assert!(is_application_number("10/2024/1"));
        assert!(is_application_number("580/0012/24"));
        assert!(!is_application_number("Application Number"));
        assert!(!is_application_number("DA 10/2024"));
        assert!(!is_application_number(""));
    }

    #[test]
    fn test_parse_lodged_date() {
        assert_eq!(parse_lodged_date("3/01/2024"), Some(date(2024, 1, 3)));
        assert_eq!(parse_lodged_date("15/12/2023"), Some(date(2023, 12, 15)));
        assert_eq!(parse_lodged_date("31/02/2024"), None);
        assert_eq!(parse_lodged_date("not a date"), None);
        assert_eq!(parse_lodged_date(""), None);
    }

    #[test]
    fn test_search_date_range_and_form_format() {
        let (from, to) = search_date_range(date(2024, 3, 31), 1);
        assert_eq!(from, date(2024, 2, 29));
        assert_eq!(to, date(2024, 3, 31));
        assert_eq!(format_form_date(from), "29/02/2024");

        let (from, _) = search_date_range(date(2024, 1, 15), 2);
        assert_eq!(format_form_date(from), "15/11/2023");
    }

    #[test]
    fn test_normalize_record() {
        let record = normalizer()
            .normalize(
                "10/2024/1",
                Some(date(2024, 1, 3)),
                "12  Smith  St Nuriootpa SA 5355",
                "Fence",
            )
            .expect("record should be kept");

        assert_eq!(record.council_reference, "10/2024/1");
        assert_eq!(record.address, "12 Smith St Nuriootpa SA 5355");
        assert_eq!(record.description, "Fence");
        assert_eq!(record.received_date_text(), "2024-01-03");
        assert_eq!(record.scrape_date_text(), "2024-02-01");
        assert_eq!(
            record.comment_url.as_deref(),
            Some("mailto:council@example.org")
        );
    }

    #[test]
    fn test_normalize_drops_blank_address() {
        assert!(normalizer().normalize("10/2024/1", None, "  ", "Fence").is_none());
    }

    #[test]
    fn test_normalize_empties_future_received_date() {
        let record = normalizer()
            .normalize("10/2024/1", Some(date(2024, 5, 1)), "1 Main St", "")
            .unwrap();
        assert_eq!(record.received_date, None);
        assert_eq!(record.received_date_text(), "");
        assert_eq!(record.description, NO_DESCRIPTION);
    }
}
