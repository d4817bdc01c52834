use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use risk_dash_core::DashboardSettings;

pub const ENV_PREFIX: &str = "RISK_DASH";

/// Flags that override whatever the file and environment say.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub base_url: Option<&'a str>,
    pub token: Option<&'a str>,
    pub page_url: Option<&'a str>,
}

/// Layer an optional config file, `RISK_DASH_*` variables and CLI flags.
pub fn load_settings(path: Option<&Path>, overrides: Overrides<'_>) -> Result<DashboardSettings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    let mut settings: DashboardSettings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()
        .and_then(|config| config.try_deserialize::<DashboardSettings>())
        .with_context(|| match path {
            Some(path) => format!("failed to load settings from {}", path.display()),
            None => "failed to load settings from environment".to_string(),
        })?;

    if let Some(base_url) = overrides.base_url {
        settings.base_url = base_url.to_string();
    }
    if let Some(token) = overrides.token {
        settings.token = Some(token.to_string());
    }
    if let Some(page_url) = overrides.page_url {
        settings = settings.with_page_url(page_url);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::fs::write;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn reset_env() {
        for key in ["BASE_URL", "TOKEN", "TIMEOUT_SECS", "MAX_POLL_ATTEMPTS", "DEMO_SOURCE"] {
            env::remove_var(format!("{ENV_PREFIX}_{key}"));
        }
    }

    #[test]
    fn defaults_without_sources() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env();
        let settings = load_settings(None, Overrides::default()).unwrap();
        assert_eq!(settings, DashboardSettings::default());
    }

    #[test]
    fn file_then_env_then_flags() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env();
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write(
            file.path(),
            "base_url = \"http://file:9000\"\ntoken = \"from-file\"\nmax_poll_attempts = 3\n",
        )
        .unwrap();
        env::set_var("RISK_DASH_TOKEN", "from-env");

        let settings = load_settings(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(settings.base_url, "http://file:9000");
        assert_eq!(settings.token.as_deref(), Some("from-env"));
        assert_eq!(settings.max_poll_attempts, Some(3));

        let settings = load_settings(
            Some(file.path()),
            Overrides {
                base_url: Some("http://flag:1"),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(settings.base_url, "http://flag:1");
        reset_env();
    }

    #[test]
    fn page_url_supplies_missing_token() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env();
        let settings = load_settings(
            None,
            Overrides {
                page_url: Some("https://dash.example/?token=xyz"),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(settings.token.as_deref(), Some("xyz"));
    }
}
