use crate::scrape::ScrapeError;
use crate::session::{CapturedResponse, PageSnapshot};
use crate::utilities::{message, LogMessage};

lazy_static::lazy_static! {
    static ref SHIP_ID_PATTERNS: Vec<regex::Regex> = vec![
        regex::Regex::new(r"(?i)shipid:(\d+)").unwrap(),
        regex::Regex::new(r#""shipId"[:\s]*"?(\d+)"#).unwrap(),
        regex::Regex::new(r#""vesselId"[:\s]*"?(\d+)"#).unwrap(),
    ];
}

const DEFAULT_BASE_URL: &str = "https://www.marinetraffic.com";
const MARKER_SELECTOR: &str = "h1";

pub struct MarineTrafficSession {
    client: reqwest::blocking::Client,
    base_url: String,
    wait: crate::configuration::WaitConfiguration,
    captured: Vec<CapturedResponse>,
}

impl MarineTrafficSession {
    pub fn new(
        configuration: &crate::configuration::ProviderConfiguration,
        wait: &crate::configuration::WaitConfiguration,
    ) -> Result<Self, ScrapeError> {
        let client = crate::session::client().map_err(|error| ScrapeError::Session {
            provider: crate::vessel::Provider::MarineTraffic.to_string(),
            message: error.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: configuration
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            wait: wait.to_owned(),
            captured: vec![],
        })
    }

    pub fn detail_url(&self, mmsi: &str) -> String {
        format!("{:}/en/ais/details/ships/mmsi:{:}", self.base_url, mmsi)
    }

    fn api_urls(&self, ship_id: &str) -> Vec<String> {
        vec![
            format!("{:}/en/vessels/{:}/position", self.base_url, ship_id),
            format!("{:}/en/vessels/{:}/general", self.base_url, ship_id),
        ]
    }

    pub fn navigate(
        &mut self,
        identifier: &crate::vessel::VesselIdentifier,
    ) -> Result<(PageSnapshot, Vec<LogMessage>), ScrapeError> {
        let mmsi = match identifier {
            crate::vessel::VesselIdentifier::Mmsi(mmsi) => mmsi,
            crate::vessel::VesselIdentifier::Imo(_) => {
                return Err(ScrapeError::Configuration {
                    message: "MarineTraffic vessel pages are addressed by MMSI".to_string(),
                })
            }
        };

        let mut messages = vec![];
        let url = self.detail_url(mmsi);
        messages.push(message(format!("loading {:}", url), log::Level::Info));

        let (final_url, html) = crate::session::load_page(&self.client, &url)?;
        let page = PageSnapshot::new(final_url, html);

        let api_urls = match ship_id(&page.url, &page.html) {
            Some(ship_id) => {
                messages.push(message(
                    format!("found ship id {:}", ship_id),
                    log::Level::Debug,
                ));
                self.api_urls(&ship_id)
            }
            None => {
                messages.push(message(
                    "no ship id on page; skipping position API",
                    log::Level::Debug,
                ));
                vec![]
            }
        };

        let responses = crate::session::capture_dynamic_content(
            &self.client,
            &page,
            &api_urls,
            MARKER_SELECTOR,
            &self.wait,
            &mut messages,
        );
        self.captured.extend(responses.iter().cloned());

        Ok((page.with_responses(responses), messages))
    }

    /// returns the number of captured responses discarded
    pub fn close(self) -> usize {
        self.captured.len()
    }
}

/// the site's internal vessel id, from the redirected URL or the page source
pub fn ship_id(url: &str, html: &str) -> Option<String> {
    SHIP_ID_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(url)
                .or_else(|| pattern.captures(html))
                .and_then(|captures| captures.get(1))
        })
        .map(|id| id.as_str().to_string())
}
