pub mod credentials;

fn default_name() -> String {
    String::from("vessel_scrape")
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    #[serde(default = "default_name")]
    pub name: String,
    pub log: Option<PathConfiguration>,
    #[serde(default)]
    pub wait: WaitConfiguration,
    #[serde(default)]
    pub marinetraffic: ProviderConfiguration,
    #[serde(default)]
    pub vesselfinder: ProviderConfiguration,
    #[serde(default)]
    pub posthog: crate::configuration::credentials::PostHogCredentials,
    #[serde(default)]
    pub github: crate::configuration::credentials::GitHubCredentials,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            name: default_name(),
            log: None,
            wait: WaitConfiguration::default(),
            marinetraffic: ProviderConfiguration::default(),
            vesselfinder: ProviderConfiguration::default(),
            posthog: crate::configuration::credentials::PostHogCredentials::default(),
            github: crate::configuration::credentials::GitHubCredentials::default(),
        }
    }
}

impl RunConfiguration {
    pub fn from_file(
        path: &std::path::Path,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let file = std::fs::File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn provider(&self, provider: crate::vessel::Provider) -> &ProviderConfiguration {
        match provider {
            crate::vessel::Provider::MarineTraffic => &self.marinetraffic,
            crate::vessel::Provider::VesselFinder => &self.vesselfinder,
        }
    }

    /// fill values the file leaves empty from the given variable lookup
    pub fn with_environment(mut self, variable: impl Fn(&str) -> Option<String>) -> Self {
        let posthog = &mut self.posthog;
        fill(&mut posthog.api_key, variable("POSTHOG_API_KEY"));
        fill(&mut posthog.host, variable("POSTHOG_HOST"));

        if self.vesselfinder.credentials.is_none() {
            if let (Some(email), Some(password)) = (
                variable("VESSELFINDER_EMAIL"),
                variable("VESSELFINDER_PASSWORD"),
            ) {
                self.vesselfinder.credentials =
                    Some(crate::configuration::credentials::LoginCredentials { email, password });
            }
        }

        let github = &mut self.github;
        fill(&mut github.token, variable("GITHUB_TOKEN"));
        fill(&mut github.owner, variable("GITHUB_REPO_OWNER"));
        fill(&mut github.repo, variable("GITHUB_REPO_NAME"));

        self
    }
}

fn fill(target: &mut Option<String>, value: Option<String>) {
    if target.is_none() {
        *target = value.filter(|value| !value.is_empty());
    }
}

#[derive(serde::Deserialize, PartialEq, Debug, Clone)]
pub struct PathConfiguration {
    pub filename: std::path::PathBuf,
}

#[derive(serde::Deserialize, PartialEq, Debug, Clone, Default)]
pub struct ProviderConfiguration {
    pub base_url: Option<String>,
    pub distinct_id: Option<String>,
    pub data_source: Option<String>,
    pub credentials: Option<crate::configuration::credentials::LoginCredentials>,
}

impl ProviderConfiguration {
    pub fn distinct_id(&self, provider: crate::vessel::Provider) -> String {
        self.distinct_id
            .to_owned()
            .unwrap_or_else(|| provider.default_distinct_id().to_string())
    }

    pub fn data_source(&self, provider: crate::vessel::Provider) -> String {
        self.data_source
            .to_owned()
            .unwrap_or_else(|| provider.brand().to_string())
    }
}

fn default_timeout() -> chrono::Duration {
    *crate::DEFAULT_WAIT_TIMEOUT
}

fn default_interval() -> chrono::Duration {
    *crate::DEFAULT_WAIT_INTERVAL
}

/// bounds of the poll for dynamic page content after navigation
#[serde_with::serde_as]
#[derive(PartialEq, Debug, serde::Deserialize, Clone)]
pub struct WaitConfiguration {
    #[serde(default = "default_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    pub timeout: chrono::Duration,
    #[serde(default = "default_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    pub interval: chrono::Duration,
}

impl Default for WaitConfiguration {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            interval: default_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(filename: &str) -> RunConfiguration {
        let path = format!("{:}/{:}/{:}", env!("CARGO_MANIFEST_DIR"), "demos", filename);

        let file = std::fs::File::open(path).unwrap();
        serde_yaml::from_reader(file).unwrap()
    }

    #[test]
    fn test_example_1() {
        let configuration = demo("example_1.yaml");

        assert_eq!(configuration.name, "presido_comparison");
        assert_eq!(configuration.wait, WaitConfiguration::default());
        assert_eq!(
            configuration.posthog.api_key.as_deref(),
            Some("phc_0123456789abcdef")
        );
        assert_eq!(configuration.posthog.host(), "https://eu.posthog.com");
        assert_eq!(configuration.posthog.event(), "local_comparison");
        assert_eq!(configuration.vesselfinder.credentials, None);
    }

    #[test]
    fn test_example_2() {
        let configuration = demo("example_2.yaml");

        assert_eq!(
            configuration.wait,
            WaitConfiguration {
                timeout: chrono::Duration::seconds(45),
                interval: chrono::Duration::seconds(3),
            }
        );
        assert_eq!(
            configuration.log.unwrap(),
            PathConfiguration {
                filename: std::path::PathBuf::from("example_2.log")
            }
        );
        assert_eq!(
            configuration.vesselfinder.credentials,
            Some(crate::configuration::credentials::LoginCredentials {
                email: String::from("ops@example.com"),
                password: String::from("correct horse battery staple"),
            })
        );
        assert_eq!(
            configuration
                .vesselfinder
                .distinct_id(crate::vessel::Provider::VesselFinder),
            "vesselfinder_nightly"
        );
        assert_eq!(
            configuration
                .marinetraffic
                .distinct_id(crate::vessel::Provider::MarineTraffic),
            "selenium_scraper"
        );
        assert_eq!(
            configuration.github,
            crate::configuration::credentials::GitHubCredentials {
                token: None,
                owner: Some(String::from("harbourmaster")),
                repo: Some(String::from("vessel-comparisons")),
            }
        );
    }

    #[test]
    fn test_environment_fills_missing_values() {
        let environment: std::collections::HashMap<&str, &str> = [
            ("POSTHOG_API_KEY", "phc_from_environment"),
            ("VESSELFINDER_EMAIL", "env@example.com"),
            ("VESSELFINDER_PASSWORD", "secret"),
            ("GITHUB_TOKEN", "ghp_token"),
            ("GITHUB_REPO_OWNER", "someone-else"),
        ]
        .into_iter()
        .collect();

        let configuration = demo("example_2.yaml")
            .with_environment(|key| environment.get(key).map(|value| value.to_string()));

        assert_eq!(
            configuration.posthog.api_key.as_deref(),
            Some("phc_from_environment")
        );
        assert_eq!(configuration.github.token.as_deref(), Some("ghp_token"));
        // values from the file take precedence
        assert_eq!(configuration.github.owner.as_deref(), Some("harbourmaster"));
        assert_eq!(
            configuration.vesselfinder.credentials.unwrap().email,
            "ops@example.com"
        );
    }

    #[test]
    fn test_environment_without_file() {
        let configuration = RunConfiguration::default().with_environment(|key| match key {
            "VESSELFINDER_EMAIL" => Some(String::from("env@example.com")),
            "POSTHOG_HOST" => Some(String::new()),
            _ => None,
        });

        // both halves of the login are required
        assert_eq!(configuration.vesselfinder.credentials, None);
        assert_eq!(configuration.posthog.host(), "https://app.posthog.com");
    }
}
