use crate::scrape::ScrapeError;
use crate::session::{CapturedResponse, PageSnapshot};
use crate::utilities::{message, LogMessage};

const DEFAULT_BASE_URL: &str = "https://www.vesselfinder.com";
const MARKER_SELECTOR: &str = "h1";

pub struct VesselFinderSession {
    client: reqwest::blocking::Client,
    base_url: String,
    credentials: crate::configuration::credentials::LoginCredentials,
    wait: crate::configuration::WaitConfiguration,
    captured: Vec<CapturedResponse>,
    authenticated: bool,
}

/// the fields of the site's sign-in form
#[derive(Debug, PartialEq)]
pub struct LoginForm {
    pub action: String,
    pub email_field: String,
    pub password_field: String,
    pub hidden: Vec<(String, String)>,
}

impl VesselFinderSession {
    pub fn new(
        configuration: &crate::configuration::ProviderConfiguration,
        wait: &crate::configuration::WaitConfiguration,
    ) -> Result<Self, ScrapeError> {
        let credentials = match &configuration.credentials {
            Some(credentials) => credentials.to_owned(),
            None => {
                return Err(ScrapeError::Configuration {
                    message: "VesselFinder requires login credentials (VESSELFINDER_EMAIL and VESSELFINDER_PASSWORD)".to_string(),
                })
            }
        };

        let client = crate::session::client().map_err(|error| ScrapeError::Session {
            provider: crate::vessel::Provider::VesselFinder.to_string(),
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
            credentials,
            wait: wait.to_owned(),
            captured: vec![],
            authenticated: false,
        })
    }

    pub fn login_url(&self) -> String {
        format!("{:}/login", self.base_url)
    }

    pub fn detail_url(&self, identifier: &crate::vessel::VesselIdentifier) -> String {
        format!(
            "{:}/vessels/details/{:}",
            self.base_url,
            identifier.value()
        )
    }

    fn api_urls(&self, identifier: &crate::vessel::VesselIdentifier) -> Vec<String> {
        match identifier {
            crate::vessel::VesselIdentifier::Mmsi(mmsi) => {
                vec![format!("{:}/api/pub/click/{:}", self.base_url, mmsi)]
            }
            crate::vessel::VesselIdentifier::Imo(_) => vec![],
        }
    }

    pub fn login(&mut self) -> Result<Vec<LogMessage>, ScrapeError> {
        let provider = crate::vessel::Provider::VesselFinder.to_string();
        let mut messages = vec![];

        let login_url = self.login_url();
        let (page_url, html) = crate::session::load_page(&self.client, &login_url).map_err(
            |error| ScrapeError::Session {
                provider: provider.to_owned(),
                message: error.to_string(),
            },
        )?;

        let form = parse_login_form(&html, &page_url).ok_or_else(|| ScrapeError::Session {
            provider: provider.to_owned(),
            message: format!("no sign-in form at {:}", page_url),
        })?;

        let mut fields = form.hidden.to_owned();
        fields.push((form.email_field.to_owned(), self.credentials.email.to_owned()));
        fields.push((
            form.password_field.to_owned(),
            self.credentials.password.to_owned(),
        ));

        let response = self
            .client
            .post(&form.action)
            .header(reqwest::header::REFERER, &page_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(encode_form(&fields))
            .send()
            .map_err(|error| ScrapeError::Session {
                provider: provider.to_owned(),
                message: error.to_string(),
            })?;

        let final_url = response.url().to_string();
        if !response.status().is_success() {
            return Err(ScrapeError::Authentication {
                provider,
                message: format!("sign-in returned {:}", response.status()),
            });
        }
        if final_url.to_lowercase().contains("login") {
            return Err(ScrapeError::Authentication {
                provider,
                message: format!("still on sign-in page as {:}", self.credentials.email),
            });
        }

        self.authenticated = true;
        messages.push(message(
            format!("signed in to {:} as {:}", provider, self.credentials.email),
            log::Level::Info,
        ));
        Ok(messages)
    }

    pub fn navigate(
        &mut self,
        identifier: &crate::vessel::VesselIdentifier,
    ) -> Result<(PageSnapshot, Vec<LogMessage>), ScrapeError> {
        let mut messages = vec![];
        if !self.authenticated {
            messages.extend(self.login()?);
        }

        let url = self.detail_url(identifier);
        messages.push(message(format!("loading {:}", url), log::Level::Info));

        let (final_url, html) = crate::session::load_page(&self.client, &url)?;
        let page = PageSnapshot::new(final_url, html);

        let responses = crate::session::capture_dynamic_content(
            &self.client,
            &page,
            &self.api_urls(identifier),
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

fn encode_form(fields: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

/// find the form holding a password input and resolve where it posts to
pub fn parse_login_form(html: &str, page_url: &str) -> Option<LoginForm> {
    let document = scraper::Html::parse_document(html);
    let form_selector = scraper::Selector::parse("form").ok()?;
    let input_selector = scraper::Selector::parse("input[name]").ok()?;

    for form in document.select(&form_selector) {
        let mut email_field = None;
        let mut password_field = None;
        let mut hidden = vec![];

        for input in form.select(&input_selector) {
            let element = input.value();
            let name = match element.attr("name") {
                Some(name) => name.to_string(),
                None => continue,
            };
            let kind = element.attr("type").unwrap_or("text").to_lowercase();
            let lowered = name.to_lowercase();

            match kind.as_str() {
                "password" => {
                    password_field.get_or_insert(name);
                }
                "hidden" => hidden.push((name, element.attr("value").unwrap_or("").to_string())),
                "email" => {
                    email_field = Some(name);
                }
                "text"
                    if lowered.contains("email")
                        || lowered.contains("user")
                        || lowered.contains("login") =>
                {
                    email_field.get_or_insert(name);
                }
                _ => {}
            }
        }

        if let (Some(email_field), Some(password_field)) = (email_field, password_field) {
            let action = form.value().attr("action").unwrap_or("");
            let action = match url::Url::parse(page_url) {
                Ok(base) => base
                    .join(action)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| page_url.to_string()),
                Err(_) => page_url.to_string(),
            };

            return Some(LoginForm {
                action,
                email_field,
                password_field,
                hidden,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> crate::configuration::ProviderConfiguration {
        crate::configuration::ProviderConfiguration {
            credentials: Some(crate::configuration::credentials::LoginCredentials {
                email: String::from("ops@example.com"),
                password: String::from("hunter2"),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_login_form() {
        let html = r#"<html><body>
            <form action="/search" method="get"><input type="text" name="q"></form>
            <form action="/login" method="post">
                <input type="hidden" name="_csrf" value="a1b2c3">
                <input type="email" name="email">
                <input type="password" name="password">
                <button type="submit">Sign in</button>
            </form></body></html>"#;

        let form = parse_login_form(html, "https://www.vesselfinder.com/login").unwrap();

        assert_eq!(
            form,
            LoginForm {
                action: String::from("https://www.vesselfinder.com/login"),
                email_field: String::from("email"),
                password_field: String::from("password"),
                hidden: vec![(String::from("_csrf"), String::from("a1b2c3"))],
            }
        );
    }

    #[test]
    fn test_login_form_without_action() {
        let html = r#"<form><input name="username"><input type="password" name="pass"></form>"#;

        let form = parse_login_form(html, "https://www.vesselfinder.com/login?next=/").unwrap();

        assert_eq!(form.action, "https://www.vesselfinder.com/login?next=/");
        assert_eq!(form.email_field, "username");
        assert_eq!(form.password_field, "pass");
    }

    #[test]
    fn test_encode_form() {
        let fields = vec![
            (String::from("email"), String::from("ops@example.com")),
            (String::from("password"), String::from("correct horse&battery")),
        ];

        assert_eq!(
            encode_form(&fields),
            "email=ops%40example.com&password=correct+horse%26battery"
        );
    }

    #[test]
    fn test_no_login_form() {
        assert_eq!(
            parse_login_form("<h1>Maintenance</h1>", "https://www.vesselfinder.com/login"),
            None
        );
    }

    #[test]
    fn test_credentials_are_required() {
        let result = VesselFinderSession::new(
            &crate::configuration::ProviderConfiguration::default(),
            &crate::configuration::WaitConfiguration::default(),
        );

        assert!(matches!(result, Err(ScrapeError::Configuration { .. })));
    }

    #[test]
    fn test_urls() {
        let session = VesselFinderSession::new(
            &configuration(),
            &crate::configuration::WaitConfiguration::default(),
        )
        .unwrap();

        let imo = crate::vessel::VesselIdentifier::Imo(String::from("9321483"));
        let mmsi = crate::vessel::VesselIdentifier::Mmsi(String::from("226013370"));

        assert_eq!(session.login_url(), "https://www.vesselfinder.com/login");
        assert_eq!(
            session.detail_url(&imo),
            "https://www.vesselfinder.com/vessels/details/9321483"
        );
        assert!(session.api_urls(&imo).is_empty());
        assert_eq!(
            session.api_urls(&mmsi),
            vec!["https://www.vesselfinder.com/api/pub/click/226013370"]
        );
    }

    #[test]
    #[ignore]
    fn test_live_login() {
        let mut session = VesselFinderSession::new(
            &crate::configuration::RunConfiguration::default()
                .with_environment(|key| std::env::var(key).ok())
                .vesselfinder,
            &crate::configuration::WaitConfiguration::default(),
        )
        .unwrap();

        session.login().unwrap();
    }
}
