use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::job::ensure_success;
use crate::settings::DashboardSettings;
use crate::{DashboardError, Result};

/// A named demo dataset and the badge it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoTemplate {
    pub name: &'static str,
    pub file: &'static str,
    pub theme: &'static str,
    pub universe: &'static str,
}

pub const DEMO_TEMPLATES: &[DemoTemplate] = &[
    DemoTemplate {
        name: "import-tariffs",
        file: "import_tariffs.json",
        theme: "US Import Tariffs Against China",
        universe: "Top 100 US",
    },
    DemoTemplate {
        name: "energy-cost",
        file: "energy-cost.json",
        theme: "Energy Cost Increase Risk",
        universe: "Top 100 US",
    },
    DemoTemplate {
        name: "operational-technology",
        file: "operational_technology.json",
        theme: "Operational & Technology Risk",
        universe: "Top 100 US",
    },
];

impl DemoTemplate {
    pub fn lookup(name: &str) -> std::result::Result<&'static DemoTemplate, ValidationError> {
        DEMO_TEMPLATES
            .iter()
            .find(|t| t.name == name.trim())
            .ok_or_else(|| ValidationError::UnknownDemo {
                name: name.to_string(),
                available: DEMO_TEMPLATES
                    .iter()
                    .map(|t| t.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Where demo report files are fetched from.
#[async_trait]
pub trait DemoRepository: Send + Sync {
    /// Fetch the raw (usually legacy-shaped) report for a template.
    async fn load_report(&self, template: &DemoTemplate) -> Result<Value>;
}

/// Reads demo files from a local directory.
pub struct DirectoryDemoRepository {
    base_path: PathBuf,
}

impl DirectoryDemoRepository {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl DemoRepository for DirectoryDemoRepository {
    async fn load_report(&self, template: &DemoTemplate) -> Result<Value> {
        let path = self.base_path.join(template.file);
        debug!(path = %path.display(), "reading demo report");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| DashboardError::Io {
                path: path.display().to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            DashboardError::MalformedData(format!(
                "demo file {} is not valid JSON: {err}",
                path.display()
            ))
        })
    }
}

/// Fetches demo files from a static-file URL prefix.
pub struct HttpDemoRepository {
    http: Client,
    base: Url,
}

impl HttpDemoRepository {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DashboardError::transport)?;
        Ok(Self { http, base })
    }
}

#[async_trait]
impl DemoRepository for HttpDemoRepository {
    async fn load_report(&self, template: &DemoTemplate) -> Result<Value> {
        let url = self.base.join(template.file).map_err(|err| {
            DashboardError::Protocol(format!("cannot build demo URL from `{}`: {err}", self.base))
        })?;
        debug!(%url, "fetching demo report");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(DashboardError::transport)?;
        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| DashboardError::MalformedData(format!("demo data is not valid JSON: {err}")))
    }
}

/// Pick the repository named by `demo_source`.
///
/// A value starting with `http://` or `https://` is a URL prefix, anything else a
/// directory. Without one, files are served from `{base_url}/static/data/`.
pub fn demo_repository(settings: &DashboardSettings) -> Result<Box<dyn DemoRepository>> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.demo_source.as_deref().map(str::trim) {
        Some(source) if source.starts_with("http://") || source.starts_with("https://") => {
            Ok(Box::new(HttpDemoRepository::new(directory_url(source)?, timeout)?))
        }
        Some(source) if !source.is_empty() => Ok(Box::new(DirectoryDemoRepository::new(source))),
        _ => {
            let base = directory_url(&settings.base_url)?;
            let data = base.join("static/data/").map_err(|err| {
                DashboardError::Protocol(format!("cannot build demo URL: {err}"))
            })?;
            Ok(Box::new(HttpDemoRepository::new(data, timeout)?))
        }
    }
}

/// Parse `raw` as a URL whose path ends in `/`, so relative joins append to it.
fn directory_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|err| DashboardError::Protocol(format!("invalid demo URL `{raw}`: {err}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lookup_known_and_unknown_names() {
        let template = DemoTemplate::lookup("energy-cost").unwrap();
        assert_eq!(template.file, "energy-cost.json");
        let err = DemoTemplate::lookup("moon-landing").unwrap_err();
        assert!(err.to_string().contains("import-tariffs"));
    }

    #[test]
    fn directory_url_keeps_prefix() {
        let url = directory_url("http://localhost:8000/assets").unwrap();
        assert_eq!(
            url.join("x.json").unwrap().as_str(),
            "http://localhost:8000/assets/x.json"
        );
    }

    #[tokio::test]
    async fn directory_repository_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("energy-cost.json"), r#"{"risk_scoring": {}}"#).unwrap();
        let repo = DirectoryDemoRepository::new(dir.path());
        let template = DemoTemplate::lookup("energy-cost").unwrap();
        let value = repo.load_report(template).await.unwrap();
        assert!(value.get("risk_scoring").is_some());
    }

    #[tokio::test]
    async fn directory_repository_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = DirectoryDemoRepository::new(dir.path());
        let template = DemoTemplate::lookup("import-tariffs").unwrap();
        assert!(matches!(
            repo.load_report(template).await,
            Err(DashboardError::Io { .. })
        ));

        fs::write(dir.path().join("import_tariffs.json"), "{not json").unwrap();
        assert!(matches!(
            repo.load_report(template).await,
            Err(DashboardError::MalformedData(_))
        ));
    }

    #[test]
    fn repository_kind_follows_demo_source() {
        let settings = DashboardSettings {
            demo_source: Some("/tmp/demo".into()),
            ..DashboardSettings::default()
        };
        assert!(demo_repository(&settings).is_ok());
        let settings = DashboardSettings {
            base_url: "not a url".into(),
            ..DashboardSettings::default()
        };
        assert!(demo_repository(&settings).is_err());
    }
}
