use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalize::normalize_whitespace;
use crate::types::{FormState, SummaryRow};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to resolve link '{href}': {source}")]
    LinkResolve {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

const JS_TOKEN_MARKER: &str = ".aspx?js=";
const ADDRESS_HEADER: &str = "Formatted Property Address";
const ADDRESS_CELL_INDEX: usize = 4;

static SEL_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("invalid selector: script"));
static SEL_EVENT_VALIDATION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="__EVENTVALIDATION"]"#)
        .expect("invalid selector: event validation")
});
static SEL_VIEW_STATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="__VIEWSTATE"]"#).expect("invalid selector: view state")
});
static SEL_PAGE_INFO: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#ctl00_MainContent_lblPageInfo").expect("invalid selector: page info")
});
static SEL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: tr"));
static SEL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: a[href]"));
static SEL_TH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("invalid selector: th"));
static SEL_TD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: td"));

static RE_TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*$").expect("invalid regex: trailing number"));

/// Everything the paginator and extractor need from one results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsPage {
    pub form_state: FormState,
    pub page_count: Option<u32>,
    pub rows: Vec<SummaryRow>,
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn input_value(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .and_then(|e| e.value().attr("value"))
        .unwrap_or_default()
        .to_string()
}

/// Finds the client-capability token the portal embeds in an inline script,
/// e.g. `location.replace('default.aspx?js=1138')`.
pub fn parse_js_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document.select(&SEL_SCRIPT).find_map(|script| {
        let text = elem_text(script);
        let start = text.find(JS_TOKEN_MARKER)? + JS_TOKEN_MARKER.len();
        let rest = &text[start..];
        let end = rest.find(['"', '\''])?;
        Some(rest[..end].to_string())
    })
}

pub fn parse_form_state(html: &str) -> FormState {
    form_state_of(&Html::parse_document(html))
}

fn form_state_of(document: &Html) -> FormState {
    FormState {
        event_validation: input_value(document, &SEL_EVENT_VALIDATION),
        view_state: input_value(document, &SEL_VIEW_STATE),
    }
}

/// Reads the trailing integer of the "Page 1 of N" label.
pub fn parse_page_count(html: &str) -> Option<u32> {
    page_count_of(&Html::parse_document(html))
}

fn page_count_of(document: &Html) -> Option<u32> {
    let label = document.select(&SEL_PAGE_INFO).next().map(elem_text)?;
    RE_TRAILING_NUMBER
        .captures(label.trim())
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

/// Collects every table row with at least four data cells, in document order.
pub fn parse_summary_rows(html: &str) -> Vec<SummaryRow> {
    summary_rows_of(&Html::parse_document(html))
}

fn summary_rows_of(document: &Html) -> Vec<SummaryRow> {
    document
        .select(&SEL_ROW)
        .filter_map(|row| {
            // Direct children only, so layout tables wrapping the grid do not match.
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "td")
                .collect();
            if cells.len() < 4 {
                return None;
            }

            Some(SummaryRow {
                application_number: normalize_whitespace(&elem_text(cells[0])),
                detail_href: cells[0]
                    .select(&SEL_LINK)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string),
                lodged: normalize_whitespace(&elem_text(cells[1])),
                address: normalize_whitespace(&elem_text(cells[2])),
                description: elem_text(cells[3]).trim().to_string(),
            })
        })
        .collect()
}

pub fn parse_results_page(html: &str) -> ResultsPage {
    let document = Html::parse_document(html);
    ResultsPage {
        form_state: form_state_of(&document),
        page_count: page_count_of(&document),
        rows: summary_rows_of(&document),
    }
}

/// Reads the address from the property table of an application detail page:
/// the fifth data cell of the table whose header mentions the formatted address.
pub fn parse_detail_address(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let header = document
        .select(&SEL_TH)
        .find(|th| elem_text(*th).contains(ADDRESS_HEADER))?;

    let table = header
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")?;

    let address = table
        .select(&SEL_TD)
        .nth(ADDRESS_CELL_INDEX)
        .map(|td| normalize_whitespace(&elem_text(td)))?;

    (!address.is_empty()).then_some(address)
}

/// Resolves a link from a results row against the page it was found on.
pub fn resolve_link(page_url: &Url, href: &str) -> Result<Url, ParseError> {
    page_url.join(href).map_err(|source| ParseError::LinkResolve {
        href: href.to_string(),
        source,
    })
}
