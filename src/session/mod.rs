#[cfg(feature = "marinetraffic")]
pub mod marinetraffic;
#[cfg(feature = "vesselfinder")]
pub mod vesselfinder;

use crate::scrape::ScrapeError;
use crate::utilities::{message, LogMessage};

lazy_static::lazy_static! {
    pub static ref USER_AGENT: String = String::from("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");
    static ref REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);
    static ref MINIMUM_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);
}

/// an API response the vessel page loads alongside its HTML
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl CapturedResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.body.trim()).ok()
    }
}

/// everything the extractor reads from one loaded vessel page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub responses: Vec<CapturedResponse>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            responses: vec![],
        }
    }

    pub fn with_responses(mut self, responses: Vec<CapturedResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn document(&self) -> scraper::Html {
        scraper::Html::parse_document(&self.html)
    }

    /// visible text of the page, one text node per line, without script or style contents
    pub fn rendered_text(&self) -> String {
        let document = self.document();
        let mut lines = vec![];
        for node in document.root_element().descendants() {
            if let scraper::Node::Text(text) = node.value() {
                let hidden = node
                    .parent()
                    .and_then(|parent| {
                        parent.value().as_element().map(|element| {
                            matches!(element.name(), "script" | "style" | "noscript" | "template")
                        })
                    })
                    .unwrap_or(false);
                let text = text.trim();
                if !hidden && !text.is_empty() {
                    lines.push(text.to_string());
                }
            }
        }
        lines.join("\n")
    }

    pub fn has_element(&self, selector: &str) -> bool {
        match scraper::Selector::parse(selector) {
            Ok(selector) => self.document().select(&selector).next().is_some(),
            Err(_) => false,
        }
    }
}

pub enum Session {
    #[cfg(feature = "marinetraffic")]
    MarineTraffic(crate::session::marinetraffic::MarineTrafficSession),
    #[cfg(feature = "vesselfinder")]
    VesselFinder(crate::session::vesselfinder::VesselFinderSession),
}

impl Session {
    /// open (and, where the provider needs it, authenticate) a session
    pub fn establish(
        provider: crate::vessel::Provider,
        configuration: &crate::configuration::RunConfiguration,
        headless: bool,
    ) -> Result<(Self, Vec<LogMessage>), ScrapeError> {
        let mut messages = vec![];
        if !headless {
            messages.push(message(
                "interactive sessions are not supported; continuing headless",
                log::Level::Warn,
            ));
        }

        let session = match provider {
            #[cfg(feature = "marinetraffic")]
            crate::vessel::Provider::MarineTraffic => {
                Self::MarineTraffic(crate::session::marinetraffic::MarineTrafficSession::new(
                    &configuration.marinetraffic,
                    &configuration.wait,
                )?)
            }
            #[cfg(feature = "vesselfinder")]
            crate::vessel::Provider::VesselFinder => {
                let mut session = crate::session::vesselfinder::VesselFinderSession::new(
                    &configuration.vesselfinder,
                    &configuration.wait,
                )?;
                messages.extend(session.login()?);
                Self::VesselFinder(session)
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(ScrapeError::Session {
                    provider: other.to_string(),
                    message: "support for this provider was not compiled in".to_string(),
                })
            }
        };

        messages.push(message(
            format!("opened {:} session", provider),
            log::Level::Debug,
        ));
        Ok((session, messages))
    }

    pub fn provider(&self) -> crate::vessel::Provider {
        match self {
            #[cfg(feature = "marinetraffic")]
            Self::MarineTraffic(_) => crate::vessel::Provider::MarineTraffic,
            #[cfg(feature = "vesselfinder")]
            Self::VesselFinder(_) => crate::vessel::Provider::VesselFinder,
        }
    }

    /// load the vessel's detail page and wait for its dynamic content
    pub fn navigate(
        &mut self,
        identifier: &crate::vessel::VesselIdentifier,
    ) -> Result<(PageSnapshot, Vec<LogMessage>), ScrapeError> {
        match self {
            #[cfg(feature = "marinetraffic")]
            Self::MarineTraffic(session) => session.navigate(identifier),
            #[cfg(feature = "vesselfinder")]
            Self::VesselFinder(session) => session.navigate(identifier),
        }
    }

    /// release the client and any captured responses
    pub fn close(self) -> Vec<LogMessage> {
        let provider = self.provider();
        let discarded = match self {
            #[cfg(feature = "marinetraffic")]
            Self::MarineTraffic(session) => session.close(),
            #[cfg(feature = "vesselfinder")]
            Self::VesselFinder(session) => session.close(),
        };
        vec![message(
            format!(
                "closed {:} session; discarded {:} captured response(s)",
                provider, discarded
            ),
            log::Level::Debug,
        )]
    }
}

pub fn client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT.to_owned())
        .cookie_store(true)
        .gzip(true)
        .timeout(Some(*REQUEST_TIMEOUT))
        .build()
}

/// load a page, returning its final URL (after redirects) and body
pub fn load_page(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<(String, String), ScrapeError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .map_err(|error| ScrapeError::Navigation {
            url: url.to_owned(),
            message: error.to_string(),
        })?;
    let final_url = response.url().to_string();

    match response.status() {
        status if status.is_success() => {
            let body = response.text().map_err(|error| ScrapeError::Navigation {
                url: final_url.to_owned(),
                message: error.to_string(),
            })?;
            Ok((final_url, body))
        }
        other => Err(ScrapeError::Navigation {
            url: final_url,
            message: other.to_string(),
        }),
    }
}

/// request one of the page's API endpoints; failures are reported but never fatal
pub fn probe(
    client: &reqwest::blocking::Client,
    url: &str,
    referer: &str,
    messages: &mut Vec<LogMessage>,
) -> Option<CapturedResponse> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
        .header(reqwest::header::REFERER, referer)
        .header("X-Requested-With", "XMLHttpRequest")
        .send();

    match response {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.text() {
                Ok(body) => {
                    messages.push(message(
                        format!("captured {:} ({:} bytes) from {:}", status, body.len(), url),
                        log::Level::Debug,
                    ));
                    Some(CapturedResponse::new(url, status, body))
                }
                Err(error) => {
                    messages.push(message(
                        format!("could not read response from {:}; {:}", url, error),
                        log::Level::Debug,
                    ));
                    None
                }
            }
        }
        Err(error) => {
            messages.push(message(
                format!("request to {:} failed; {:}", url, error),
                log::Level::Debug,
            ));
            None
        }
    }
}

/// poll until `poll` yields a value or the configured timeout elapses
pub fn wait_for<T>(
    wait: &crate::configuration::WaitConfiguration,
    mut poll: impl FnMut() -> Option<T>,
) -> Option<T> {
    let timeout = wait.timeout.to_std().unwrap_or_default();
    let interval = wait
        .interval
        .to_std()
        .unwrap_or_default()
        .max(*MINIMUM_POLL_INTERVAL);
    let start = std::time::Instant::now();

    loop {
        if let Some(found) = poll() {
            return Some(found);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return None;
        }
        std::thread::sleep(interval.min(timeout - elapsed));
    }
}

/// capture API responses until one carries JSON; without endpoints to probe, only check the page for `marker`
pub fn capture_dynamic_content(
    client: &reqwest::blocking::Client,
    page: &PageSnapshot,
    api_urls: &[String],
    marker: &str,
    wait: &crate::configuration::WaitConfiguration,
    messages: &mut Vec<LogMessage>,
) -> Vec<CapturedResponse> {
    // a static page will not change between polls
    if api_urls.is_empty() {
        if page.has_element(marker) {
            messages.push(message(
                format!("page shows {:}; nothing further to load", marker),
                log::Level::Debug,
            ));
        } else {
            messages.push(message(
                format!("page has no {:} element; extracting from what loaded", marker),
                log::Level::Warn,
            ));
        }
        return vec![];
    }

    let mut latest: Vec<CapturedResponse> = vec![];
    let mut attempts = 0;

    let found = wait_for(wait, || {
        attempts += 1;
        let responses: Vec<CapturedResponse> = api_urls
            .iter()
            .filter_map(|url| probe(client, url, &page.url, messages))
            .collect();
        let has_json = responses.iter().any(|response| response.json().is_some());
        if !responses.is_empty() {
            latest = responses;
        }
        if has_json {
            Some(())
        } else {
            None
        }
    });

    match found {
        Some(()) => messages.push(message(
            format!("dynamic content ready after {:} attempt(s)", attempts),
            log::Level::Debug,
        )),
        None => messages.push(message(
            format!(
                "dynamic content did not appear within {:}; extracting from what loaded",
                crate::utilities::duration_string(&wait.timeout)
            ),
            log::Level::Warn,
        )),
    }

    latest
}
