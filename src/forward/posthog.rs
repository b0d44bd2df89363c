use crate::forward::{AnalyticsEvent, EventSink, ForwardingWarning};

lazy_static::lazy_static! {
    static ref REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
}

/// PostHog's public capture endpoint
pub struct PostHogSink {
    client: reqwest::blocking::Client,
    api_key: String,
    host: String,
}

impl PostHogSink {
    pub fn new(
        credentials: &crate::configuration::credentials::PostHogCredentials,
    ) -> Result<Self, ForwardingWarning> {
        let api_key = match credentials.api_key.as_deref() {
            Some(api_key) if !api_key.is_empty() => api_key.to_string(),
            _ => {
                return Err(ForwardingWarning::NotConfigured {
                    message: "no PostHog API key (POSTHOG_API_KEY)".to_string(),
                })
            }
        };

        let host = credentials.host().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .user_agent(crate::session::USER_AGENT.to_owned())
            .timeout(Some(*REQUEST_TIMEOUT))
            .build()
            .map_err(|error| ForwardingWarning::Unreachable {
                url: host.to_owned(),
                message: error.to_string(),
            })?;

        Ok(Self {
            client,
            api_key,
            host,
        })
    }

    pub fn capture_url(&self) -> String {
        format!("{:}/capture/", self.host)
    }

    fn body(&self, event: &AnalyticsEvent) -> serde_json::Value {
        serde_json::json!({
            "api_key": self.api_key,
            "event": event.event,
            "distinct_id": event.distinct_id,
            "properties": event.properties,
            "timestamp": event.timestamp,
        })
    }
}

impl EventSink for PostHogSink {
    fn capture(&self, event: &AnalyticsEvent) -> Result<(), ForwardingWarning> {
        let url = self.capture_url();
        let response = self
            .client
            .post(&url)
            .json(&self.body(event))
            .send()
            .map_err(|error| ForwardingWarning::Unreachable {
                url: url.to_owned(),
                message: error.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(ForwardingWarning::Rejected {
                url,
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            }),
        }
    }
}
