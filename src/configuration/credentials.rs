#[derive(serde::Deserialize, Clone, PartialEq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

fn default_posthog_host() -> String {
    String::from("https://app.posthog.com")
}

fn default_event() -> String {
    String::from("local_comparison")
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PostHogCredentials {
    pub api_key: Option<String>,
    pub host: Option<String>,
    pub event: Option<String>,
}

impl PostHogCredentials {
    pub fn host(&self) -> String {
        self.host.to_owned().unwrap_or_else(default_posthog_host)
    }

    pub fn event(&self) -> String {
        self.event.to_owned().unwrap_or_else(default_event)
    }
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Default)]
pub struct GitHubCredentials {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
}
