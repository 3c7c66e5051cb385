pub mod extractor;
pub mod navigator;
pub mod normalize;
pub mod pagination;
pub mod parser;
pub mod scraper;
pub mod session;
pub mod store;
pub mod types;

pub use scraper::{ScrapeConfig, Scraper, ScraperError};
pub use session::{HttpTransport, Session, Transport};
pub use store::{MemoryStore, SqliteStore, Store, UpsertPolicy};

pub(crate) const BASE_URL: &str = "https://epayments.barossa.sa.gov.au/ePathway/Production/Web/";
pub(crate) const COMMENT_URL: &str = "mailto:barossa@barossa.sa.gov.au";

pub(crate) const DEFAULT_PAGE: &str = "default.aspx";
pub(crate) const ENQUIRY_LISTS_PAGE: &str = "GeneralEnquiry/EnquiryLists.aspx";
pub(crate) const ENQUIRY_SEARCH_PAGE: &str = "GeneralEnquiry/EnquirySearch.aspx";
pub(crate) const ENQUIRY_SUMMARY_PAGE: &str = "GeneralEnquiry/EnquirySummaryView.aspx";
