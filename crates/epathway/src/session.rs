use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use url::{Url, form_urlencoded};

use crate::parser::parse_js_token;
use crate::scraper::ScraperError;

/// Network access used by the pipeline. Implementations must keep cookies
/// across calls and follow redirects.
pub trait Transport {
    fn get(&self, url: &Url) -> impl Future<Output = Result<String, ScraperError>>;

    fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> impl Future<Output = Result<String, ScraperError>>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ScraperError> {
        let jar = Arc::new(Jar::default());
        let mut builder = Client::builder().cookie_provider(jar).user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url.clone())
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<String, ScraperError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        Ok(self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

/// A portal session: the transport carrying the cookie jar plus the portal root.
#[derive(Debug)]
pub struct Session<'a, T> {
    transport: &'a T,
    base_url: Url,
}

impl<'a, T: Transport> Session<'a, T> {
    /// Opens the portal's default page and, when the page asks for it, replays
    /// the `js` client-capability token so later pages come back in their
    /// script-enabled variant.
    pub async fn bootstrap(transport: &'a T, base_url: Url) -> Result<Self, ScraperError> {
        let session = Self {
            transport,
            base_url,
        };

        let default_url = session.url(crate::DEFAULT_PAGE)?;
        log::info!("Retrieving default page: {}", default_url);
        let html = session.get(&default_url).await?;

        match parse_js_token(&html) {
            Some(token) => {
                let mut url = default_url;
                url.query_pairs_mut().append_pair("js", &token);
                log::info!("Replaying client capability token: {}", url);
                session.get(&url).await?;
            }
            None => log::info!("No client capability token found; continuing without it"),
        }

        Ok(session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a portal path such as `GeneralEnquiry/EnquirySearch.aspx`.
    pub fn url(&self, path: &str) -> Result<Url, ScraperError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn get(&self, url: &Url) -> Result<String, ScraperError> {
        self.transport.get(url).await
    }

    pub async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<String, ScraperError> {
        self.transport.post_form(url, fields).await
    }
}
