use std::fmt::Display;

use chrono::{Local, NaiveDate};
use url::Url;

use crate::extractor::{AddressMode, Extraction, Extractor};
use crate::navigator::{navigate, postback};
use crate::normalize::{Normalizer, search_date_range};
use crate::pagination::{Paginator, page_event_target};
use crate::parser::{ParseError, parse_results_page};
use crate::session::{Session, Transport};
use crate::store::{Store, StoreError};
use crate::types::{DevelopmentApplication, RunSummary, UpsertOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Transport failure: {0}")]
    TransportError(String),
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Portal root, e.g. `https://host/ePathway/Production/Web/`.
    pub base_url: String,
    pub information_url: String,
    pub comment_url: Option<String>,
    pub lookback_months: u32,
    pub address_mode: AddressMode,
    pub run_date: NaiveDate,
}

impl ScrapeConfig {
    /// Configuration for an ePathway portal rooted at `base_url`, searching
    /// one month back from today.
    pub fn for_portal(base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        Self {
            information_url: format!("{}{}", base_url, crate::ENQUIRY_LISTS_PAGE),
            base_url,
            comment_url: Some(crate::COMMENT_URL.to_string()),
            lookback_months: 1,
            address_mode: AddressMode::default(),
            run_date: Local::now().date_naive(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::for_portal(crate::BASE_URL)
    }
}

/// Stages of a run, executed strictly in order.
enum Stage<'a, T> {
    Bootstrap,
    Navigate(Session<'a, T>),
    Paginate {
        session: Session<'a, T>,
        first_page: String,
    },
    Done,
}

impl<T> Display for Stage<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Bootstrap => write!(f, "bootstrap"),
            Stage::Navigate(_) => write!(f, "navigate"),
            Stage::Paginate { .. } => write!(f, "paginate"),
            Stage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug)]
pub struct Scraper<T> {
    transport: T,
    config: ScrapeConfig,
}

impl<T: Transport> Scraper<T> {
    pub fn new(transport: T, config: ScrapeConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Performs one scrape pass and hands every resolved application to `store`.
    pub async fn run<S: Store>(&self, store: &mut S) -> Result<RunSummary, ScraperError> {
        let base_url = Url::parse(&self.config.base_url)?;
        let (date_from, date_to) =
            search_date_range(self.config.run_date, self.config.lookback_months);
        let mut summary = RunSummary::default();

        let mut stage = Stage::Bootstrap;
        loop {
            log::debug!("Entering stage: {}", stage);
            stage = match stage {
                Stage::Bootstrap => {
                    Stage::Navigate(Session::bootstrap(&self.transport, base_url.clone()).await?)
                }
                Stage::Navigate(session) => {
                    let first_page = navigate(&session, date_from, date_to).await?;
                    Stage::Paginate {
                        session,
                        first_page,
                    }
                }
                Stage::Paginate {
                    session,
                    first_page,
                } => {
                    self.paginate(&session, &first_page, store, &mut summary)
                        .await?;
                    Stage::Done
                }
                Stage::Done => break,
            };
        }

        Ok(summary)
    }

    async fn paginate<S: Store>(
        &self,
        session: &Session<'_, T>,
        first_page: &str,
        store: &mut S,
        summary: &mut RunSummary,
    ) -> Result<(), ScraperError> {
        let summary_url = session.url(crate::ENQUIRY_SUMMARY_PAGE)?;
        let extractor = Extractor {
            address_mode: self.config.address_mode,
            normalizer: Normalizer {
                scrape_date: self.config.run_date,
                information_url: self.config.information_url.clone(),
                comment_url: self.config.comment_url.clone(),
            },
        };

        let mut page = parse_results_page(first_page);
        let mut paginator = Paginator::new(page.page_count);
        log::info!("Portal reports {} page(s) of results", paginator.page_count());

        loop {
            let number = paginator.begin_page();
            log::info!(
                "Processing results page {} of {} ({} rows)",
                number,
                paginator.page_count(),
                page.rows.len()
            );
            summary.pages += 1;

            for row in &page.rows {
                match extractor.extract(session, &summary_url, row).await? {
                    Extraction::Record(record) => {
                        summary.retrieved += 1;
                        persist(store, &record, summary)?;
                    }
                    Extraction::Unaddressed => {
                        summary.retrieved += 1;
                        summary.discarded += 1;
                    }
                    Extraction::Rejected => {}
                }
            }

            let Some(next) = paginator.next_page() else {
                break;
            };

            let mut url = summary_url.clone();
            url.query_pairs_mut()
                .append_pair("PageNumber", &next.to_string());
            log::info!("Retrieving results page {}: {}", next, url);
            let form = postback(&page.form_state, &page_event_target(next), "", &[]);
            let html = session.post_form(&url, &form).await?;
            page = parse_results_page(&html);
        }

        Ok(())
    }
}

fn persist<S: Store>(
    store: &mut S,
    record: &DevelopmentApplication,
    summary: &mut RunSummary,
) -> Result<(), ScraperError> {
    let outcome = store.upsert(record).inspect_err(|e| {
        log::error!(
            "Failed to store application {}: {}",
            record.council_reference,
            e
        )
    })?;

    match outcome {
        UpsertOutcome::Inserted => log::info!(
            "Inserted application {} with address \"{}\" and description \"{}\"",
            record.council_reference,
            record.address,
            record.description
        ),
        UpsertOutcome::Skipped => log::info!(
            "Skipped application {} because it was already present in the database",
            record.council_reference
        ),
        UpsertOutcome::Replaced => log::info!(
            "Replaced application {} in the database",
            record.council_reference
        ),
    }
    summary.record(outcome);
    Ok(())
}
