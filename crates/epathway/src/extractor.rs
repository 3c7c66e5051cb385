use chrono::NaiveDate;
use url::Url;

use crate::normalize::{Normalizer, is_application_number, parse_lodged_date};
use crate::parser::{parse_detail_address, resolve_link};
use crate::scraper::ScraperError;
use crate::session::{Session, Transport};
use crate::types::{DevelopmentApplication, SummaryRow};

/// Where a record's address comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressMode {
    /// Follow each row's link to its detail page and read the formatted address.
    #[default]
    DetailPage,
    /// Use the site address column of the results grid.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(DevelopmentApplication),
    /// The row is not an application row (header, pager, bad number or date).
    Rejected,
    /// An accepted row whose address could not be resolved.
    Unaddressed,
}

/// Returns the lodgement date of a row that looks like an application.
pub fn accept_row(row: &SummaryRow, mode: AddressMode) -> Option<NaiveDate> {
    if !is_application_number(&row.application_number) {
        return None;
    }
    let lodged = parse_lodged_date(&row.lodged)?;
    if mode == AddressMode::Inline && row.address.trim().is_empty() {
        return None;
    }
    Some(lodged)
}

#[derive(Debug, Clone)]
pub struct Extractor {
    pub address_mode: AddressMode,
    pub normalizer: Normalizer,
}

impl Extractor {
    pub async fn extract<T: Transport>(
        &self,
        session: &Session<'_, T>,
        page_url: &Url,
        row: &SummaryRow,
    ) -> Result<Extraction, ScraperError> {
        let Some(lodged) = accept_row(row, self.address_mode) else {
            log::debug!(
                "Ignoring row '{}' lodged '{}'",
                row.application_number,
                row.lodged
            );
            return Ok(Extraction::Rejected);
        };
        log::info!("Retrieved application {}", row.application_number);

        let address = match self.address_mode {
            AddressMode::Inline => Some(row.address.clone()),
            AddressMode::DetailPage => self.fetch_detail_address(session, page_url, row).await?,
        };

        let record = address.and_then(|address| {
            self.normalizer.normalize(
                &row.application_number,
                Some(lodged),
                &address,
                &row.description,
            )
        });

        Ok(match record {
            Some(record) => Extraction::Record(record),
            None => {
                log::warn!(
                    "Discarding application {}: no address could be found",
                    row.application_number
                );
                Extraction::Unaddressed
            }
        })
    }

    async fn fetch_detail_address<T: Transport>(
        &self,
        session: &Session<'_, T>,
        page_url: &Url,
        row: &SummaryRow,
    ) -> Result<Option<String>, ScraperError> {
        let Some(href) = row.detail_href.as_deref() else {
            log::warn!(
                "Application {} has no link to its detail page",
                row.application_number
            );
            return Ok(None);
        };

        let url = resolve_link(page_url, href)?;
        log::info!(
            "Retrieving details of application {}: {}",
            row.application_number,
            url
        );
        let html = session.post_form(&url, &[]).await?;
        Ok(parse_detail_address(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ScriptedTransport;

    fn row(number: &str, lodged: &str, address: &str) -> SummaryRow {
        SummaryRow {
            application_number: number.to_string(),
            detail_href: Some("EnquiryDetailView.aspx?Id=1".to_string()),
            lodged: lodged.to_string(),
            address: address.to_string(),
            description: "Fence".to_string(),
        }
    }

    #[test]
    fn test_accept_row_requires_number_and_date() {
        let lodged = NaiveDate::from_ymd_opt(2024, 1, 3);
        assert_eq!(
            accept_row(&row("10/2024/1", "3/01/2024", ""), AddressMode::DetailPage),
            lodged
        );
        assert_eq!(
            accept_row(&row("10/2024/1", "31/02/2024", ""), AddressMode::DetailPage),
            None
        );
        assert_eq!(
            accept_row(&row("Application", "3/01/2024", ""), AddressMode::DetailPage),
            None
        );
    }

    #[test]
    fn test_accept_row_inline_requires_address() {
        assert_eq!(
            accept_row(&row("10/2024/1", "3/01/2024", " "), AddressMode::Inline),
            None
        );
        assert!(accept_row(&row("10/2024/1", "3/01/2024", "1 Main St"), AddressMode::Inline).is_some());
    }

    #[tokio::test]
    async fn test_row_without_detail_link_is_unaddressed() {
        let html = r#"<table>
            <tr><td>10/2024/1</td><td>3/01/2024</td><td></td><td>Fence</td></tr>
        </table>"#;
        let rows = crate::parser::parse_summary_rows(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].detail_href, None);

        let transport = ScriptedTransport::new(["<html></html>"]);
        let base = Url::parse("https://council.example/ePathway/Production/Web/").unwrap();
        let session = Session::bootstrap(&transport, base.clone()).await.unwrap();
        let extractor = Extractor {
            address_mode: AddressMode::DetailPage,
            normalizer: Normalizer {
                scrape_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                information_url: "https://council.example/EnquiryLists.aspx".to_string(),
                comment_url: None,
            },
        };

        let extraction = extractor.extract(&session, &base, &rows[0]).await.unwrap();
        assert_eq!(extraction, Extraction::Unaddressed);
        // Only the bootstrap request; no detail page was fetched.
        assert_eq!(transport.requests().len(), 1);
    }
}
