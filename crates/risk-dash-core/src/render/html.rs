//! Markup helpers shared by every view. Only the literals in this crate are
//! trusted markup; anything that came from a user or the service goes through
//! [`escape`].

use crate::job::{LogLevel, LogLine};

pub(crate) const EMPTY_STATE_TEXT: &str = "No data to display";

/// Escape text for use in element content or a quoted attribute value.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_opt(s: Option<&str>) -> String {
    s.map(escape).unwrap_or_default()
}

pub(crate) fn empty_state(view: &str) -> String {
    format!(
        r#"<div class="empty-state" data-view="{view}">{EMPTY_STATE_TEXT}</div>"#,
        view = escape(view)
    )
}

pub(crate) fn error_block(view: &str, message: &str) -> String {
    format!(
        r#"<div class="render-error" data-view="{view}">❌ {message}</div>"#,
        view = escape(view),
        message = escape(message)
    )
}

/// Render polled log lines, coloured by their classification.
pub fn render_logs(lines: &[LogLine]) -> String {
    let body: String = lines
        .iter()
        .map(|line| {
            let class = match line.level {
                LogLevel::Error => "log-line log-error",
                LogLevel::Success => "log-line log-success",
                LogLevel::Info => "log-line log-info",
                LogLevel::Plain => "log-line",
            };
            format!(
                "<div class=\"{class}\">{text}</div>",
                text = escape(&line.text)
            )
        })
        .collect();
    format!(r#"<div class="log-viewer">{body}</div>"#)
}

pub(crate) fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; margin: 0; background: #18181b; color: #e4e4e7; }
.container { max-width: 1400px; margin: 0 auto; padding: 2rem; }
.config-badge { display: flex; justify-content: space-between; gap: 0.5rem; padding: 0.5rem 1rem; border: 1px solid #3f3f46; border-radius: 0.5rem; margin-bottom: 1.5rem; }
.config-badge .theme { font-weight: 600; color: #60a5fa; }
.config-badge .sep { color: #71717a; }
.config-badge .demo-tag { font-size: 0.7rem; text-transform: uppercase; color: #fbbf24; }
.config-badge .run-time { font-size: 0.75rem; color: #71717a; }
section.view { margin-bottom: 2.5rem; }
section.view > h2 { border-bottom: 1px solid #3f3f46; padding-bottom: 0.5rem; }
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; margin-bottom: 1.5rem; }
.card { background: #27272a; border-left: 4px solid #ea580c; padding: 1rem; border-radius: 0.5rem; }
.card h3 { margin: 0 0 0.25rem; font-size: 0.8rem; color: #a1a1aa; }
.card .value { font-size: 1.4rem; font-weight: 700; }
.card .value.critical { color: #f87171; }
.card .value.factors { color: #fb923c; }
.card .value.evidence { color: #fbbf24; }
table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
th, td { border: 1px solid #3f3f46; padding: 0.35rem 0.5rem; text-align: left; vertical-align: top; }
th { background: #27272a; }
.heat-1 { background: #450a0a; } .heat-2 { background: #7f1d1d; } .heat-3 { background: #b91c1c; } .heat-4 { background: #ef4444; color: #18181b; }
.company-card { background: #27272a; border-radius: 0.5rem; padding: 1rem; margin-bottom: 1rem; }
.company-card .score { float: right; font-weight: 700; color: #34d399; }
.company-card ul { margin: 0.5rem 0 0; padding-left: 1.2rem; }
.taxonomy-node { border-left: 2px solid #3f3f46; padding: 0.25rem 0.75rem; margin: 0.25rem 0; }
.taxonomy-node .node-id { font-size: 0.7rem; color: #71717a; margin-left: 0.5rem; }
.taxonomy-node .keywords { font-size: 0.75rem; color: #a1a1aa; }
.empty-state { padding: 2rem; text-align: center; color: #71717a; border: 1px dashed #3f3f46; border-radius: 0.5rem; }
.render-error { padding: 1rem; color: #f87171; border: 1px solid #7f1d1d; border-radius: 0.5rem; }
.log-viewer { font-family: ui-monospace, monospace; font-size: 0.8rem; background: #09090b; padding: 0.75rem; border-radius: 0.5rem; }
.log-error { color: #f87171; } .log-success { color: #4ade80; } .log-info { color: #38bdf8; }
"#
}
