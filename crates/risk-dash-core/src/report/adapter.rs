use serde_json::Value;
use tracing::debug;

use super::{CanonicalReport, CompanyScore, LegacyCompanyScore, LegacyReport, RawReport};

/// Convert a report of either shape into the canonical one.
///
/// Canonical input is returned as-is. Legacy input has its sections renamed
/// and each company's `risks` moved to `themes`; everything else is copied.
pub fn adapt(raw: RawReport) -> CanonicalReport {
    match raw {
        RawReport::Canonical(report) => report,
        RawReport::Legacy(legacy) => from_legacy(legacy),
    }
}

/// Resolve the shape of a JSON report and adapt it.
pub fn adapt_value(value: &Value) -> crate::Result<CanonicalReport> {
    RawReport::from_value(value.clone()).map(adapt)
}

fn from_legacy(legacy: LegacyReport) -> CanonicalReport {
    let LegacyReport {
        risk_scoring,
        risk_taxonomy,
        content,
        extra,
    } = legacy;
    debug!(
        companies = risk_scoring.as_ref().map_or(0, |s| s.len()),
        "adapting legacy report"
    );
    CanonicalReport {
        theme_scoring: risk_scoring.map(|scoring| {
            scoring
                .into_iter()
                .map(|(name, company)| (name, company_from_legacy(company)))
                .collect()
        }),
        theme_taxonomy: risk_taxonomy,
        content,
        extra,
    }
}

fn company_from_legacy(company: LegacyCompanyScore) -> CompanyScore {
    let LegacyCompanyScore {
        ticker,
        industry,
        composite_score,
        motivation,
        risks,
        themes,
        extra,
    } = company;
    CompanyScore {
        ticker,
        industry,
        composite_score,
        motivation,
        themes: risks.or(themes).unwrap_or_default(),
        extra,
    }
}
