//! Projection of a canonical report into the four dashboard views.
//!
//! Views are independent: a missing section yields an empty-state marker for
//! its view and a malformed one yields an inline error, while the other views
//! still render.

mod html;
mod taxonomy;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::dashboard::ConfigBadge;
use crate::report::{CanonicalReport, CompanyScore, EvidenceChunk, Score};
use crate::Result;

pub use html::{escape, render_logs};
pub use taxonomy::{render_mindmap, MAX_TAXONOMY_DEPTH};

use html::{empty_state, error_block, escape_opt, inline_css};

/// The dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Summary,
    Companies,
    Mindmap,
    Evidence,
}

impl View {
    pub const ALL: [View; 4] = [View::Summary, View::Companies, View::Mindmap, View::Evidence];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Companies => "companies",
            Self::Mindmap => "mindmap",
            Self::Evidence => "evidence",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Companies => "Companies",
            Self::Mindmap => "Risk Taxonomy",
            Self::Evidence => "Evidence",
        }
    }
}

/// HTML fragments, one per view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedViews {
    pub summary: String,
    pub companies: String,
    pub mindmap: String,
    pub evidence: String,
}

impl RenderedViews {
    pub fn get(&self, view: View) -> &str {
        match view {
            View::Summary => &self.summary,
            View::Companies => &self.companies,
            View::Mindmap => &self.mindmap,
            View::Evidence => &self.evidence,
        }
    }

    /// Every view showing the empty state.
    pub fn empty() -> Self {
        Self {
            summary: empty_state(View::Summary.as_str()),
            companies: empty_state(View::Companies.as_str()),
            mindmap: empty_state(View::Mindmap.as_str()),
            evidence: empty_state(View::Evidence.as_str()),
        }
    }
}

/// Renders reports; carries the scenario/universe shown on the summary cards.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    scenario: Option<String>,
    universe: Option<String>,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_badge(badge: &ConfigBadge) -> Self {
        Self {
            scenario: badge.display_theme().map(str::to_string),
            universe: badge.display_universe().map(str::to_string),
        }
    }

    pub fn render(&self, report: &CanonicalReport) -> RenderedViews {
        RenderedViews {
            summary: match &report.theme_scoring {
                Some(scoring) => or_error_block(View::Summary, self.render_summary(report, scoring)),
                None => empty_state(View::Summary.as_str()),
            },
            companies: match &report.theme_scoring {
                Some(scoring) => or_error_block(View::Companies, render_company_cards(scoring)),
                None => empty_state(View::Companies.as_str()),
            },
            mindmap: match &report.theme_taxonomy {
                Some(root) => or_error_block(View::Mindmap, render_mindmap(root)),
                None => empty_state(View::Mindmap.as_str()),
            },
            evidence: match &report.content {
                Some(chunks) => or_error_block(View::Evidence, render_evidence_table(chunks)),
                None => empty_state(View::Evidence.as_str()),
            },
        }
    }

    fn render_summary(
        &self,
        report: &CanonicalReport,
        scoring: &BTreeMap<String, CompanyScore>,
    ) -> Result<String> {
        let columns = report.theme_columns();
        let (top_score, top_company) = match report.top_company() {
            Some((name, score)) => (escape(&score.to_string()), escape(name)),
            None => ("N/A".to_string(), String::new()),
        };
        let mut out = format!(
            r#"<div class="cards">
<div class="card"><h3>Risk Scenario:</h3><div class="value">{scenario}</div><div>{universe}</div></div>
<div class="card"><h3>Companies Analyzed</h3><div class="value">{companies}</div></div>
<div class="card"><h3>Risk Factors Identified</h3><div class="value factors">{factors}</div></div>
<div class="card"><h3>Highest Risk Score</h3><div class="value critical">{top_score}</div><div>{top_company}</div></div>
<div class="card"><h3>Supporting Evidence</h3><div class="value evidence">{evidence}</div></div>
</div>"#,
            scenario = escape(self.scenario.as_deref().unwrap_or("N/A")),
            universe = escape(self.universe.as_deref().unwrap_or("N/A")),
            companies = scoring.len(),
            factors = columns.len(),
            evidence = report.evidence_count(),
        );
        out.push_str(&render_heatmap(scoring, &columns)?);
        Ok(out)
    }
}

fn or_error_block(view: View, rendered: Result<String>) -> String {
    rendered.unwrap_or_else(|err| error_block(view.as_str(), &err.to_string()))
}

fn composite_text(company: &CompanyScore) -> String {
    company
        .composite_score
        .as_ref()
        .map(|score| escape(&score.to_string()))
        .unwrap_or_default()
}

fn render_heatmap(scoring: &BTreeMap<String, CompanyScore>, columns: &[&str]) -> Result<String> {
    if scoring.is_empty() {
        return Ok(empty_state(View::Summary.as_str()));
    }
    let max = scoring
        .values()
        .flat_map(|c| c.themes.values())
        .filter_map(Score::as_f64)
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let mut rows: Vec<(&String, &CompanyScore)> = scoring.iter().collect();
    rows.sort_by(|(a_name, a), (b_name, b)| {
        let composite = |c: &CompanyScore| {
            c.composite_score
                .as_ref()
                .and_then(Score::as_f64)
                .unwrap_or(f64::NEG_INFINITY)
        };
        composite(b)
            .partial_cmp(&composite(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a_name.cmp(b_name))
    });

    let mut out = String::from(r#"<table class="heatmap"><thead><tr><th>Company</th><th>Composite</th>"#);
    for column in columns {
        write!(out, "<th>{}</th>", escape(column))?;
    }
    out.push_str("</tr></thead><tbody>");
    for (name, company) in rows {
        write!(
            out,
            "<tr><td>{}</td><td>{}</td>",
            escape(name),
            composite_text(company)
        )?;
        for column in columns {
            match company.themes.get(*column).filter(|s| s.is_shown()) {
                Some(score) => write!(
                    out,
                    r#"<td class="heat-{band}">{text}</td>"#,
                    band = score.as_f64().map_or(0, |v| heat_band(v, max)),
                    text = escape(&score.to_string())
                )?,
                None => out.push_str("<td></td>"),
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    Ok(out)
}

fn heat_band(score: f64, max: f64) -> u8 {
    if max <= 0.0 {
        return 0;
    }
    ((score.abs() / max) * 4.0).ceil().clamp(1.0, 4.0) as u8
}

fn render_company_cards(scoring: &BTreeMap<String, CompanyScore>) -> Result<String> {
    if scoring.is_empty() {
        return Ok(empty_state(View::Companies.as_str()));
    }
    let mut out = String::from(r#"<div class="company-cards">"#);
    for (name, company) in scoring {
        write!(
            out,
            r#"<div class="company-card"><span class="score">{score}</span><h3>{name}</h3><div class="meta">{ticker} · {industry}</div>"#,
            score = composite_text(company),
            name = escape(name),
            ticker = escape_opt(company.ticker.as_deref()),
            industry = escape_opt(company.industry.as_deref()),
        )?;
        if let Some(motivation) = company.motivation.as_deref() {
            write!(out, r#"<p class="motivation">{}</p>"#, escape(motivation))?;
        }
        let mut scores = String::new();
        for (theme, score) in company.shown_themes() {
            write!(
                scores,
                "<li>{}: {}</li>",
                escape(theme),
                escape(&score.to_string())
            )?;
        }
        if !scores.is_empty() {
            write!(out, "<ul>{scores}</ul>")?;
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
    Ok(out)
}

const EVIDENCE_HEADERS: [&str; 10] = [
    "Date",
    "Company",
    "Document",
    "Headline",
    "Quote",
    "Motivation",
    "Sub-scenario",
    "Risk Channel",
    "Risk Factor",
    "Highlights",
];

/// One row per chunk, in input order; absent fields are empty cells.
pub fn render_evidence_table(chunks: &[EvidenceChunk]) -> Result<String> {
    let mut out = String::from(r#"<table class="evidence"><thead><tr>"#);
    for header in EVIDENCE_HEADERS {
        write!(out, "<th>{header}</th>")?;
    }
    out.push_str("</tr></thead><tbody>");
    for chunk in chunks {
        let cells = [
            escape_opt(chunk.date.as_deref()),
            escape_opt(chunk.company.as_deref()),
            escape_opt(chunk.document_id.as_deref()),
            escape_opt(chunk.headline.as_deref()),
            escape_opt(chunk.quote.as_deref()),
            escape_opt(chunk.motivation.as_deref()),
            escape_opt(chunk.sub_scenario.as_deref()),
            escape_opt(chunk.risk_channel.as_deref()),
            escape_opt(chunk.risk_factor.as_deref()),
            escape(&chunk.highlights.join("; ")),
        ];
        out.push_str("<tr>");
        for cell in cells {
            write!(out, "<td>{cell}</td>")?;
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    Ok(out)
}

/// Assemble a self-contained HTML page with the badge and every view.
pub fn render_page(views: &RenderedViews, badge: Option<&ConfigBadge>, logs: Option<&str>) -> String {
    let badge_html = badge.and_then(ConfigBadge::render_html).unwrap_or_default();
    let sections: String = View::ALL
        .iter()
        .map(|view| {
            format!(
                r#"<section class="view" id="{id}"><h2>{title}</h2>{body}</section>"#,
                id = view.as_str(),
                title = view.title(),
                body = views.get(*view),
            )
        })
        .collect();
    let log_section = logs
        .map(|l| format!(r#"<section class="view" id="logs"><h2>Logs</h2>{l}</section>"#))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Risk Analyzer Dashboard</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        {badge_html}
        {sections}
        {log_section}
    </div>
</body>
</html>"#,
        css = inline_css(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::adapt_value;
    use serde_json::json;

    fn sample() -> CanonicalReport {
        adapt_value(&json!({
            "risk_scoring": {
                "Acme <Corp>": {
                    "ticker": "ACME",
                    "industry": "Widgets",
                    "composite_score": 12.5,
                    "motivation": "Exposed",
                    "risks": {"Supply": 10, "Demand": 0}
                },
                "Beta": {"composite_score": 40, "risks": {"Pricing": 7}}
            },
            "risk_taxonomy": {"label": "Root", "node": 1, "children": [{"label": "Supply", "node": 2}]},
            "content": [
                {"headline": "<script>alert(1)</script>", "company": "Acme", "highlights": ["one", "two"]},
                {"quote": "second"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn missing_sections_render_empty_state_for_each_view() {
        let views = ReportRenderer::new().render(&CanonicalReport::default());
        for view in View::ALL {
            let html = views.get(view);
            assert!(html.contains(r#"class="empty-state""#), "{view:?}");
            assert!(html.contains(&format!(r#"data-view="{}""#, view.as_str())));
        }
    }

    #[test]
    fn partially_missing_report_only_empties_missing_views() {
        let report = adapt_value(&json!({"content": [{"headline": "x"}]})).unwrap();
        let views = ReportRenderer::new().render(&report);
        assert!(views.summary.contains("empty-state"));
        assert!(views.mindmap.contains("empty-state"));
        assert!(!views.evidence.contains("empty-state"));
    }

    #[test]
    fn evidence_headline_is_escaped() {
        let views = ReportRenderer::new().render(&sample());
        assert!(views
            .evidence
            .contains("<td>&lt;script&gt;alert(1)&lt;/script&gt;</td>"));
        assert!(!views.evidence.contains("<script>"));
    }

    #[test]
    fn evidence_rows_keep_order_and_empty_cells() {
        let views = ReportRenderer::new().render(&sample());
        assert_eq!(views.evidence.matches("<tr>").count(), 3);
        assert!(views.evidence.contains("<td>one; two</td>"));
        let second_row = views.evidence.split("<tr>").nth(3).unwrap();
        assert_eq!(second_row.matches("<td></td>").count(), 9);
        assert!(second_row.contains("<td>second</td>"));
    }

    #[test]
    fn company_cards_show_only_non_zero_scores() {
        let views = ReportRenderer::new().render(&sample());
        assert!(views.companies.contains("<li>Supply: 10</li>"));
        assert!(!views.companies.contains("Demand"));
        assert!(views.companies.contains("Acme &lt;Corp&gt;"));
        assert!(views.companies.contains(r#"<span class="score">12.5</span>"#));
    }

    #[test]
    fn heatmap_uses_union_columns_and_orders_by_composite() {
        let views = ReportRenderer::new().render(&sample());
        for column in ["Demand", "Pricing", "Supply"] {
            assert!(views.summary.contains(&format!("<th>{column}</th>")));
        }
        let beta = views.summary.find("<td>Beta</td>").unwrap();
        let acme = views.summary.find("<td>Acme &lt;Corp&gt;</td>").unwrap();
        assert!(beta < acme);
        assert!(views.summary.contains("Risk Factors Identified"));
    }

    #[test]
    fn integer_scores_render_as_sent() {
        let views = ReportRenderer::new().render(&sample());
        assert!(views.summary.contains(r#"<td class="heat-4">10</td>"#));
        assert!(views.summary.contains("<td>40</td>"));
        assert!(!views.summary.contains("10.0"));
        assert!(!views.companies.contains("40.0"));
    }

    #[test]
    fn null_and_text_scores_render_without_failing() {
        let report = adapt_value(&json!({
            "risk_scoring": {
                "Acme": {"composite_score": null, "risks": {"Supply": null, "Demand": "<b>5</b>"}}
            },
            "risk_taxonomy": {"label": "Root", "children": null},
            "content": [{"headline": "h", "highlights": null}]
        }))
        .unwrap();
        let views = ReportRenderer::new().render(&report);
        assert!(views.companies.contains("<li>Demand: &lt;b&gt;5&lt;/b&gt;</li>"));
        assert!(!views.companies.contains("Supply"));
        assert!(views.summary.contains("Highest Risk Score</h3><div class=\"value critical\">N/A"));
        assert!(views.mindmap.contains("<strong>Root</strong>"));
        assert_eq!(views.evidence.matches("<tr>").count(), 2);
        for view in View::ALL {
            assert!(!views.get(view).contains("render-error"), "{view:?}");
        }
    }

    #[test]
    fn malformed_taxonomy_becomes_inline_error() {
        let report = adapt_value(&json!({
            "risk_taxonomy": {"label": "Root", "node": 1, "children": [{"label": "Again", "node": 1}]}
        }))
        .unwrap();
        let views = ReportRenderer::new().render(&report);
        assert!(views.mindmap.contains("render-error"));
    }

    #[test]
    fn page_contains_every_view_section() {
        let views = ReportRenderer::new().render(&sample());
        let page = render_page(&views, None, None);
        for view in View::ALL {
            assert!(page.contains(&format!(r#"id="{}""#, view.as_str())));
        }
        assert!(page.starts_with("<!DOCTYPE html>"));
    }
}
