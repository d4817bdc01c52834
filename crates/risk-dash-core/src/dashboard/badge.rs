use chrono::{Local, NaiveTime};
use serde::Serialize;

use crate::render::escape;
use crate::request::AnalysisForm;

/// Summary of the active configuration shown above the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigBadge {
    pub main_theme: Option<String>,
    pub theme: Option<String>,
    pub companies: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<NaiveTime>,
}

/// Partial badge update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadgeUpdate {
    pub main_theme: Option<String>,
    pub theme: Option<String>,
    pub companies: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_demo: Option<bool>,
}

impl BadgeUpdate {
    /// Badge fields taken from a submitted form.
    pub fn from_form(form: &AnalysisForm) -> Self {
        let non_blank = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            main_theme: non_blank(&form.theme),
            companies: non_blank(&form.companies),
            start_date: non_blank(&form.start_date),
            end_date: non_blank(&form.end_date),
            is_demo: Some(false),
            ..Self::default()
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl ConfigBadge {
    /// Merge `update` into the badge and stamp it with the current local time.
    pub fn update(&mut self, update: BadgeUpdate) {
        self.update_at(update, Local::now().time());
    }

    pub fn update_at(&mut self, update: BadgeUpdate, at: NaiveTime) {
        let BadgeUpdate {
            main_theme,
            theme,
            companies,
            start_date,
            end_date,
            is_demo,
        } = update;
        if main_theme.is_some() {
            self.main_theme = main_theme;
        }
        if theme.is_some() {
            self.theme = theme;
        }
        if companies.is_some() {
            self.companies = companies;
        }
        if start_date.is_some() {
            self.start_date = start_date;
        }
        if end_date.is_some() {
            self.end_date = end_date;
        }
        if let Some(is_demo) = is_demo {
            self.is_demo = is_demo;
        }
        self.run_at = Some(at);
    }

    /// `main_theme`, falling back to `theme`.
    pub fn display_theme(&self) -> Option<&str> {
        present(&self.main_theme).or_else(|| present(&self.theme))
    }

    pub fn display_universe(&self) -> Option<&str> {
        present(&self.companies)
    }

    /// Badge markup, or `None` while no theme is known.
    pub fn render_html(&self) -> Option<String> {
        let theme = self.display_theme()?;
        let universe = self.display_universe().unwrap_or("N/A");
        let run_time = self
            .run_at
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default();
        let demo = if self.is_demo {
            r#"<span class="demo-tag">demo</span>"#
        } else {
            ""
        };
        Some(format!(
            r#"<div class="config-badge" title="Theme: {theme}&#10;Universe: {universe}&#10;Last run: {run_time}"><span class="theme">{theme}</span><span class="sep">|</span><span class="universe">{universe}</span>{demo}<span class="run-time">{run_time}</span></div>"#,
            theme = escape(theme),
            universe = escape(universe),
        ))
    }
}
