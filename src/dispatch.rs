use crate::scrape::{ScrapeError, ScrapeRequest};
use crate::vessel::{Provider, VesselIdentifier};

lazy_static::lazy_static! {
    static ref GITHUB_API: String = String::from("https://api.github.com");
    static ref TRIGGER_USER_AGENT: String =
        format!("{:}/{:}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchEventType {
    #[serde(rename = "scrape-marine-traffic")]
    ScrapeMarineTraffic,
    #[serde(rename = "scrape-vesselfinder")]
    ScrapeVesselFinder,
}

impl DispatchEventType {
    pub fn provider(&self) -> Provider {
        match self {
            Self::ScrapeMarineTraffic => Provider::MarineTraffic,
            Self::ScrapeVesselFinder => Provider::VesselFinder,
        }
    }

    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::MarineTraffic => Self::ScrapeMarineTraffic,
            Provider::VesselFinder => Self::ScrapeVesselFinder,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
pub struct ClientPayload {
    pub mmsi: Option<String>,
    pub imo: Option<String>,
    pub comparison_id: Option<String>,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_true")]
    pub send_to_posthog: bool,
}

impl Default for ClientPayload {
    fn default() -> Self {
        Self {
            mmsi: None,
            imo: None,
            comparison_id: None,
            headless: default_true(),
            send_to_posthog: default_true(),
        }
    }
}

/// a repository dispatch asking for one scrape
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
pub struct DispatchEvent {
    // webhook deliveries name the event type `action`
    #[serde(alias = "action")]
    pub event_type: DispatchEventType,
    #[serde(default)]
    pub client_payload: ClientPayload,
}

impl DispatchEvent {
    pub fn new(provider: Provider, client_payload: ClientPayload) -> Self {
        Self {
            event_type: DispatchEventType::for_provider(provider),
            client_payload,
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// the scrape this event asks for, if its identifiers suit the provider
    pub fn to_request(&self) -> Result<ScrapeRequest, ScrapeError> {
        let provider = self.event_type.provider();
        let payload = &self.client_payload;

        let mmsi = present(&payload.mmsi);
        let imo = present(&payload.imo);

        let identifier = match (provider, mmsi, imo) {
            (_, None, None) => {
                return Err(ScrapeError::Configuration {
                    message: String::from("either an MMSI or an IMO number is required"),
                })
            }
            (Provider::MarineTraffic, None, Some(_)) => {
                return Err(ScrapeError::Configuration {
                    message: String::from("MarineTraffic requires an MMSI"),
                })
            }
            (_, Some(mmsi), _) => VesselIdentifier::mmsi(mmsi)?,
            (Provider::VesselFinder, None, Some(imo)) => VesselIdentifier::imo(imo)?,
        };

        Ok(ScrapeRequest {
            provider,
            identifier,
            comparison_id: payload.comparison_id.to_owned(),
            headless: payload.headless,
            send_to_posthog: payload.send_to_posthog,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|value| !crate::normalize::clean_identifier(value).is_empty())
}

custom_error::custom_error! {pub TriggerError
    MissingCredential {name: String} = "GitHub {name} is not configured",
    Invalid {message: String} = "{message}",
    Unreachable {url: String, message: String} = "could not reach {url}; {message}",
    Rejected {url: String, status: u16, message: String} = "{url} returned {status}; {message}"
}

/// sends repository dispatch events that start scrapes in CI
pub struct RepositoryDispatch {
    client: reqwest::blocking::Client,
    token: String,
    owner: String,
    repo: String,
}

impl RepositoryDispatch {
    pub fn new(
        credentials: &crate::configuration::credentials::GitHubCredentials,
    ) -> Result<Self, TriggerError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .to_owned()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| TriggerError::MissingCredential {
                    name: name.to_string(),
                })
        };

        let token = required(&credentials.token, "token (GITHUB_TOKEN)")?;
        let owner = required(&credentials.owner, "repository owner (GITHUB_REPO_OWNER)")?;
        let repo = required(&credentials.repo, "repository name (GITHUB_REPO_NAME)")?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(TRIGGER_USER_AGENT.to_owned())
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build()
            .map_err(|error| TriggerError::Unreachable {
                url: GITHUB_API.to_owned(),
                message: error.to_string(),
            })?;

        Ok(Self {
            client,
            token,
            owner,
            repo,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{:}/repos/{:}/{:}/dispatches",
            *GITHUB_API, self.owner, self.repo
        )
    }

    pub fn trigger(&self, event: &DispatchEvent) -> Result<(), TriggerError> {
        event
            .to_request()
            .map_err(|error| TriggerError::Invalid {
                message: error.to_string(),
            })?;

        let url = self.url();
        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {:}", self.token),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .json(event)
            .send()
            .map_err(|error| TriggerError::Unreachable {
                url: url.to_owned(),
                message: error.to_string(),
            })?;

        match response.status() {
            reqwest::StatusCode::NO_CONTENT => Ok(()),
            status => Err(TriggerError::Rejected {
                url,
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            }),
        }
    }

    /// dispatch the same vessel to every provider, reporting each result
    pub fn trigger_all(
        &self,
        payload: &ClientPayload,
    ) -> Vec<(Provider, Result<(), TriggerError>)> {
        if present(&payload.mmsi).is_none() {
            let message = String::from("triggering every provider requires an MMSI");
            return [Provider::MarineTraffic, Provider::VesselFinder]
                .into_iter()
                .map(|provider| {
                    (
                        provider,
                        Err(TriggerError::Invalid {
                            message: message.to_owned(),
                        }),
                    )
                })
                .collect();
        }

        [Provider::MarineTraffic, Provider::VesselFinder]
            .into_iter()
            .map(|provider| {
                let payload = ClientPayload {
                    imo: None,
                    ..payload.to_owned()
                };
                (provider, self.trigger(&DispatchEvent::new(provider, payload)))
            })
            .collect()
    }
}
