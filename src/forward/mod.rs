pub mod posthog;

use crate::vessel::VesselRecord;

/// an external analytics service that accepts vessel events
pub trait EventSink {
    fn capture(&self, event: &AnalyticsEvent) -> Result<(), ForwardingWarning>;
}

#[derive(serde::Serialize, Clone, Debug, PartialEq)]
pub struct AnalyticsEvent {
    pub event: String,
    pub distinct_id: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub timestamp: String,
}

impl AnalyticsEvent {
    /// flatten a record into event properties; `comparison_id` is always present
    pub fn from_record(record: &VesselRecord, event: &str, distinct_id: &str) -> Self {
        let mut properties = match serde_json::to_value(record) {
            Ok(serde_json::Value::Object(properties)) => properties,
            _ => serde_json::Map::new(),
        };
        properties.insert(
            String::from("comparison_id"),
            serde_json::Value::String(record.comparison_id.to_owned().unwrap_or_default()),
        );

        Self {
            event: event.to_owned(),
            distinct_id: distinct_id.to_owned(),
            properties,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

custom_error::custom_error! {pub ForwardingWarning
    NotConfigured {message: String} = "forwarding skipped; {message}",
    Unreachable {url: String, message: String} = "could not reach {url}; {message}",
    Rejected {url: String, status: u16, message: String} = "{url} rejected event with status {status}; {message}"
}
