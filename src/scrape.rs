use crate::forward::{AnalyticsEvent, EventSink, ForwardingWarning};
use crate::session::{PageSnapshot, Session};
use crate::utilities::{message, LogMessage};
use crate::vessel::{Provider, VesselIdentifier, VesselRecord};

custom_error::custom_error! {pub ScrapeError
    Session {provider: String, message: String} = "could not establish {provider} session; {message}",
    Authentication {provider: String, message: String} = "{provider} authentication failed; {message}",
    Navigation {url: String, message: String} = "page unavailable at {url}; {message}",
    Configuration {message: String} = "{message}"
}

/// what to scrape, and what to do with the result
#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeRequest {
    pub provider: Provider,
    pub identifier: VesselIdentifier,
    pub comparison_id: Option<String>,
    pub headless: bool,
    pub send_to_posthog: bool,
}

pub struct ScrapeOutcome {
    pub record: VesselRecord,
    pub warning: Option<ForwardingWarning>,
    pub messages: Vec<LogMessage>,
}

/// run one scrape end to end; only session and navigation failures are errors
pub fn scrape(
    request: &ScrapeRequest,
    configuration: &crate::configuration::RunConfiguration,
    sink: Option<&dyn EventSink>,
) -> Result<ScrapeOutcome, (ScrapeError, Vec<LogMessage>)> {
    let mut messages = vec![message(
        format!(
            "scraping {:} from {:}",
            request.identifier, request.provider
        ),
        log::Level::Info,
    )];

    let (mut session, session_messages) =
        match Session::establish(request.provider, configuration, request.headless) {
            Ok(established) => established,
            Err(error) => return Err((error, messages)),
        };
    messages.extend(session_messages);

    let navigated = session.navigate(&request.identifier);
    // the session is released before anything else happens, on success or failure
    messages.extend(session.close());

    let page = match navigated {
        Ok((page, navigation_messages)) => {
            messages.extend(navigation_messages);
            page
        }
        Err(error) => return Err((error, messages)),
    };

    let mut outcome = process_page(request, configuration, &page, sink);
    messages.append(&mut outcome.messages);
    outcome.messages = messages;
    Ok(outcome)
}

/// extract, normalize and forward from an already loaded page
pub fn process_page(
    request: &ScrapeRequest,
    configuration: &crate::configuration::RunConfiguration,
    page: &PageSnapshot,
    sink: Option<&dyn EventSink>,
) -> ScrapeOutcome {
    let provider_configuration = configuration.provider(request.provider);

    let (raw, mut messages) =
        crate::extract::Extractor::for_provider(request.provider).extract(page);

    let record = crate::normalize::normalize(
        request.provider,
        &raw,
        request.comparison_id.as_deref(),
        &provider_configuration.data_source(request.provider),
    );
    messages.push(message(
        format!(
            "extracted {:} field(s) for {:}",
            record.populated_fields(),
            request.identifier
        ),
        log::Level::Info,
    ));

    let warning = if request.send_to_posthog {
        match sink {
            Some(sink) => {
                let event = AnalyticsEvent::from_record(
                    &record,
                    &configuration.posthog.event(),
                    &provider_configuration.distinct_id(request.provider),
                );
                match sink.capture(&event) {
                    Ok(()) => {
                        messages.push(message(
                            format!("sent {:} event as {:}", event.event, event.distinct_id),
                            log::Level::Info,
                        ));
                        None
                    }
                    Err(warning) => Some(warning),
                }
            }
            None => Some(ForwardingWarning::NotConfigured {
                message: String::from("no event sink available"),
            }),
        }
    } else {
        None
    };

    if let Some(warning) = &warning {
        messages.push(message(warning.to_string(), log::Level::Warn));
    }

    ScrapeOutcome {
        record,
        warning,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        events: std::cell::RefCell<Vec<AnalyticsEvent>>,
    }

    impl EventSink for RecordingSink {
        fn capture(&self, event: &AnalyticsEvent) -> Result<(), ForwardingWarning> {
            self.events.borrow_mut().push(event.to_owned());
            Ok(())
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn capture(&self, _: &AnalyticsEvent) -> Result<(), ForwardingWarning> {
            Err(ForwardingWarning::Unreachable {
                url: String::from("https://app.posthog.com/capture/"),
                message: String::from("connection refused"),
            })
        }
    }

    fn request(send_to_posthog: bool) -> ScrapeRequest {
        ScrapeRequest {
            provider: Provider::MarineTraffic,
            identifier: VesselIdentifier::Mmsi(String::from("677350000")),
            comparison_id: Some(String::from("cmp-7")),
            headless: true,
            send_to_posthog,
        }
    }

    fn presido() -> PageSnapshot {
        PageSnapshot::new(
            "https://www.marinetraffic.com/en/ais/details/ships/shipid:5630138/mmsi:677350000",
            r#"<html><body><h1>PRESIDO</h1>
            <table><tr><td>Navigation Status</td><td>Moored</td></tr></table>
            </body></html>"#,
        )
        .with_responses(vec![crate::session::CapturedResponse::new(
            "https://www.marinetraffic.com/en/vessels/5630138/position",
            200,
            r#"{"mmsi": "\"677350000\"", "lat": 4808785, "lon": 7059156.9, "speed": 0}"#,
        )])
    }

    #[test]
    fn test_page_to_record() {
        let configuration = crate::configuration::RunConfiguration::default();
        let sink = RecordingSink {
            events: std::cell::RefCell::new(vec![]),
        };

        let outcome = process_page(&request(true), &configuration, &presido(), Some(&sink));

        let record = outcome.record;
        assert_eq!(record.mmsi.as_deref(), Some("677350000"));
        assert!(crate::utilities::approx_equal(record.lat.unwrap(), 4.808785, 6));
        assert!(crate::utilities::approx_equal(record.lon.unwrap(), 7.0591569, 6));
        assert_eq!(record.name.as_deref(), Some("PRESIDO"));
        assert_eq!(record.speed, Some(0.0));
        assert_eq!(record.nav_status.as_deref(), Some("Moored"));
        assert!(outcome.warning.is_none());

        let events = sink.events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "local_comparison");
        assert_eq!(events[0].distinct_id, "selenium_scraper");
        assert_eq!(events[0].properties["comparison_id"], "cmp-7");
    }

    #[test]
    fn test_nothing_found_is_not_an_error() {
        let configuration = crate::configuration::RunConfiguration::default();

        let outcome = process_page(
            &request(false),
            &configuration,
            &PageSnapshot::new("https://www.marinetraffic.com/", "<html></html>"),
            None,
        );

        assert_eq!(outcome.record.populated_fields(), 0);
        assert_eq!(outcome.record.provider, Provider::MarineTraffic);
        assert_eq!(outcome.record.data_source, "MarineTraffic");
        assert_eq!(outcome.record.comparison_id.as_deref(), Some("cmp-7"));
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn test_sink_outage_keeps_record() {
        let configuration = crate::configuration::RunConfiguration::default();

        let outcome = process_page(&request(true), &configuration, &presido(), Some(&FailingSink));

        assert_eq!(outcome.record.name.as_deref(), Some("PRESIDO"));
        assert!(matches!(
            outcome.warning,
            Some(ForwardingWarning::Unreachable { .. })
        ));
        assert!(outcome
            .messages
            .iter()
            .any(|message| message.2 == log::Level::Warn));
    }

    #[test]
    fn test_forwarding_without_sink_warns() {
        let configuration = crate::configuration::RunConfiguration::default();

        let outcome = process_page(&request(true), &configuration, &presido(), None);

        assert!(matches!(
            outcome.warning,
            Some(ForwardingWarning::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_site_name_does_not_hide_heading() {
        let configuration = crate::configuration::RunConfiguration::default();
        let request = ScrapeRequest {
            provider: Provider::VesselFinder,
            identifier: VesselIdentifier::Imo(String::from("9321483")),
            comparison_id: None,
            headless: true,
            send_to_posthog: false,
        };
        let page = PageSnapshot::new(
            "https://www.vesselfinder.com/vessels/details/9321483",
            r#"<html><head>
            <script type="application/ld+json">{"@context": "https://schema.org", "@type": "WebSite", "name": "VesselFinder", "url": "https://www.vesselfinder.com/"}</script>
            </head><body><h1>PRESIDO</h1></body></html>"#,
        );

        let outcome = process_page(&request, &configuration, &page, None);

        assert_eq!(outcome.record.name.as_deref(), Some("PRESIDO"));
    }

    #[test]
    fn test_missing_credentials_abort() {
        let configuration = crate::configuration::RunConfiguration::default();
        let request = ScrapeRequest {
            provider: Provider::VesselFinder,
            identifier: VesselIdentifier::Imo(String::from("9321483")),
            comparison_id: None,
            headless: true,
            send_to_posthog: false,
        };

        let result = scrape(&request, &configuration, None);

        assert!(matches!(
            result,
            Err((ScrapeError::Configuration { .. }, _))
        ));
    }

    #[test]
    #[ignore]
    fn test_live_marinetraffic() {
        let configuration = crate::configuration::RunConfiguration::default();

        let outcome = scrape(&request(false), &configuration, None).unwrap();

        assert_eq!(outcome.record.provider, Provider::MarineTraffic);
    }
}
