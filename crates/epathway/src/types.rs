use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A development application as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentApplication {
    pub council_reference: String,
    pub address: String,
    pub description: String,
    pub information_url: String,
    pub comment_url: Option<String>,
    pub scrape_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    pub on_notice_from: Option<NaiveDate>,
    pub on_notice_to: Option<NaiveDate>,
}

impl DevelopmentApplication {
    /// The received date as stored: ISO 8601, or empty when unknown.
    pub fn received_date_text(&self) -> String {
        self.received_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn scrape_date_text(&self) -> String {
        self.scrape_date.format("%Y-%m-%d").to_string()
    }
}

impl Display for DevelopmentApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) {} - {}",
            self.council_reference,
            self.received_date_text(),
            self.address,
            self.description
        )
    }
}

/// The hidden ASP.NET form fields that must be echoed on every postback.
///
/// Both values are opaque; a missing field is carried as an empty string and
/// left for the server to reject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub event_validation: String,
    pub view_state: String,
}

impl FormState {
    pub fn fields(&self) -> [(&'static str, &str); 2] {
        [
            ("__EVENTVALIDATION", self.event_validation.as_str()),
            ("__VIEWSTATE", self.view_state.as_str()),
        ]
    }
}

/// One results-table row, before acceptance checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub application_number: String,
    pub detail_href: Option<String>,
    pub lodged: String,
    pub address: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Skipped,
    Replaced,
}

impl Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Skipped => write!(f, "skipped"),
            UpsertOutcome::Replaced => write!(f, "replaced"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages: u32,
    pub retrieved: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub replaced: usize,
    pub discarded: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
            UpsertOutcome::Replaced => self.replaced += 1,
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Pages processed:        {}", self.pages)?;
        writeln!(f, "  Applications retrieved: {}", self.retrieved)?;
        writeln!(f, "  Inserted:               {}", self.inserted)?;
        writeln!(f, "  Skipped:                {}", self.skipped)?;
        writeln!(f, "  Replaced:               {}", self.replaced)?;
        writeln!(f, "  Discarded:              {}", self.discarded)
    }
}
