use chrono::NaiveDate;

use crate::normalize::format_form_date;
use crate::parser::parse_form_state;
use crate::scraper::ScraperError;
use crate::session::{Session, Transport};
use crate::types::FormState;
use crate::{ENQUIRY_LISTS_PAGE, ENQUIRY_SEARCH_PAGE};

const DEVELOPMENT_APPLICATIONS_LIST: &str =
    "ctl00$MainContent$mDataList$ctl03$mDataGrid$ctl04$ctl00";
const LIST_RADIO_FIELD: &str = "mDataGrid:Column0:Property";
const NEXT_BUTTON: &str = "ctl00$MainContent$btnNext";
const TAB_CONTROL_MENU: &str = "ctl00$MainContent$tabControlMenu";
const DATE_LODGED_TAB: &str = "1";
const DATE_SEARCH_MODE_FIELD: &str = "ctl00$MainContent$mTabControl$ctl09$DateSearchRadioGroup";
const DATE_SEARCH_LAST_X_DAYS: &str = "rdoLastXDays";
const DATE_FROM_FIELD: &str = "ctl00$MainContent$mTabControl$ctl09$mFromDatePicker$dateTextBox";
const DATE_TO_FIELD: &str = "ctl00$MainContent$mTabControl$ctl09$mToDatePicker$dateTextBox";
const SEARCH_BUTTON: &str = "ctl00$MainContent$btnSearch";

/// Builds a WebForms postback: the event fields, the carried form state, then
/// any screen-specific fields.
pub(crate) fn postback(
    state: &FormState,
    event_target: &str,
    event_argument: &str,
    extra: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut fields = vec![
        ("__EVENTTARGET".to_string(), event_target.to_string()),
        ("__EVENTARGUMENT".to_string(), event_argument.to_string()),
    ];
    fields.extend(
        state
            .fields()
            .map(|(name, value)| (name.to_string(), value.to_string())),
    );
    fields.extend(
        extra
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
    );
    fields
}

/// Walks enquiry list selection, the "Date Lodged" tab and the date range
/// search, returning the first page of results.
pub async fn navigate<T: Transport>(
    session: &Session<'_, T>,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Result<String, ScraperError> {
    let lists_url = session.url(ENQUIRY_LISTS_PAGE)?;
    let search_url = session.url(ENQUIRY_SEARCH_PAGE)?;

    log::info!("Retrieving enquiry lists page: {}", lists_url);
    let html = session.get(&lists_url).await?;
    let state = parse_form_state(&html);

    log::info!("Selecting the development applications enquiry list");
    let form = postback(
        &state,
        "",
        "",
        &[
            (LIST_RADIO_FIELD, DEVELOPMENT_APPLICATIONS_LIST),
            (NEXT_BUTTON, "Next >"),
        ],
    );
    let html = session.post_form(&lists_url, &form).await?;
    let state = parse_form_state(&html);

    log::info!("Switching to the date lodged search tab");
    let form = postback(&state, TAB_CONTROL_MENU, DATE_LODGED_TAB, &[]);
    let html = session.post_form(&search_url, &form).await?;
    let state = parse_form_state(&html);

    let from = format_form_date(date_from);
    let to = format_form_date(date_to);
    log::info!("Searching for applications lodged from {} to {}", from, to);
    let form = postback(
        &state,
        "",
        "",
        &[
            (DATE_SEARCH_MODE_FIELD, DATE_SEARCH_LAST_X_DAYS),
            (DATE_FROM_FIELD, from.as_str()),
            (DATE_TO_FIELD, to.as_str()),
            (SEARCH_BUTTON, "Search"),
        ],
    );
    session.post_form(&search_url, &form).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{Method, ScriptedTransport};
    use std::fs;
    use url::Url;

    fn fixture(name: &str) -> String {
        fs::read_to_string(format!("fixtures/{name}")).expect("Failed to read fixture")
    }

    #[test]
    fn test_postback_field_order_and_values() {
        let state = FormState {
            event_validation: "ev".to_string(),
            view_state: "vs".to_string(),
        };
        let form = postback(&state, "target", "arg", &[("extra", "1")]);
        assert_eq!(
            form,
            vec![
                ("__EVENTTARGET".to_string(), "target".to_string()),
                ("__EVENTARGUMENT".to_string(), "arg".to_string()),
                ("__EVENTVALIDATION".to_string(), "ev".to_string()),
                ("__VIEWSTATE".to_string(), "vs".to_string()),
                ("extra".to_string(), "1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_navigate_relays_form_state() {
        let transport = ScriptedTransport::new([
            "<html></html>".to_string(),
            fixture("enquiry_lists.html"),
            fixture("enquiry_search.html"),
            fixture("date_search.html"),
            fixture("summary_page_1.html"),
        ]);
        let base = Url::parse("https://council.example/ePathway/Production/Web/").unwrap();
        let session = Session::bootstrap(&transport, base).await.unwrap();

        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let html = navigate(&session, from, to).await.unwrap();
        assert!(html.contains("Page 1 of 3"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);

        let lists = &requests[1];
        assert_eq!(lists.method, Method::Get);
        assert!(lists.url.path().ends_with("GeneralEnquiry/EnquiryLists.aspx"));

        let select = &requests[2];
        assert_eq!(select.method, Method::Post);
        assert_eq!(select.field("__EVENTVALIDATION"), Some("/wEdAAVlists"));
        assert_eq!(select.field("__VIEWSTATE"), Some("/wEPDwULLTE5lists"));
        assert_eq!(
            select.field(LIST_RADIO_FIELD),
            Some(DEVELOPMENT_APPLICATIONS_LIST)
        );

        let tab = &requests[3];
        assert!(tab.url.path().ends_with("GeneralEnquiry/EnquirySearch.aspx"));
        assert_eq!(tab.field("__EVENTTARGET"), Some(TAB_CONTROL_MENU));
        assert_eq!(tab.field("__EVENTARGUMENT"), Some("1"));
        assert_eq!(tab.field("__EVENTVALIDATION"), Some("/wEdAAVsearch1"));
        assert_eq!(tab.field("__VIEWSTATE"), Some("/wEPDwULLTE5search1"));

        let search = &requests[4];
        assert_eq!(search.field("__EVENTVALIDATION"), Some("/wEdAAVsearch2"));
        assert_eq!(search.field("__VIEWSTATE"), Some("/wEPDwULLTE5search2"));
        assert_eq!(search.field(DATE_FROM_FIELD), Some("01/01/2024"));
        assert_eq!(search.field(DATE_TO_FIELD), Some("01/02/2024"));
        assert_eq!(
            search.field(DATE_SEARCH_MODE_FIELD),
            Some(DATE_SEARCH_LAST_X_DAYS)
        );
    }

    #[tokio::test]
    async fn test_navigate_sends_empty_tokens_when_fields_missing() {
        let transport = ScriptedTransport::new([
            "<html></html>",
            "<html><body>Server error</body></html>",
            "<html></html>",
            "<html></html>",
            "<html></html>",
        ]);
        let base = Url::parse("https://council.example/Web/").unwrap();
        let session = Session::bootstrap(&transport, base).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        navigate(&session, date, date).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[2].field("__VIEWSTATE"), Some(""));
        assert_eq!(requests[4].field("__EVENTVALIDATION"), Some(""));
    }
}
