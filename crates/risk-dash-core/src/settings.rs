use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection and polling settings for the analysis service.
///
/// Every field has a default so a partial config file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub base_url: String,
    /// Access token appended to every request as `?token=`.
    pub token: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Stop polling after this many status requests. Unbounded when absent.
    pub max_poll_attempts: Option<u32>,
    /// URL prefix or directory holding the demo report files.
    pub demo_source: Option<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_poll_attempts: None,
            demo_source: None,
        }
    }
}

impl DashboardSettings {
    /// Adopt the `token` query parameter of the page URL unless a token is already set.
    pub fn with_page_url(mut self, page_url: &str) -> Self {
        if self.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            if let Some(token) = token_from_page_url(page_url) {
                self.token = Some(token);
            }
        }
        self
    }
}

/// Extract a non-empty `token` query parameter from a URL.
pub fn token_from_page_url(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_input_keeps_defaults() {
        let settings: DashboardSettings =
            serde_json::from_value(json!({"token": "abc", "max_poll_attempts": 10})).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.token.as_deref(), Some("abc"));
        assert_eq!(settings.max_poll_attempts, Some(10));
    }

    #[test]
    fn token_is_read_from_page_query() {
        assert_eq!(
            token_from_page_url("https://dash.example/?foo=1&token=s%20cret").as_deref(),
            Some("s cret")
        );
        assert_eq!(token_from_page_url("https://dash.example/?token="), None);
        assert_eq!(token_from_page_url("https://dash.example/"), None);
        assert_eq!(token_from_page_url("not a url"), None);
    }

    #[test]
    fn explicit_token_wins_over_page_url() {
        let settings = DashboardSettings {
            token: Some("explicit".into()),
            ..DashboardSettings::default()
        }
        .with_page_url("https://dash.example/?token=page");
        assert_eq!(settings.token.as_deref(), Some("explicit"));

        let settings = DashboardSettings::default().with_page_url("https://dash.example/?token=page");
        assert_eq!(settings.token.as_deref(), Some("page"));
    }
}
