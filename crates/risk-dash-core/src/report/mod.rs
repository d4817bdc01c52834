//! Report shapes returned by the analysis service.
//!
//! Two wire shapes exist. The legacy one names its sections `risk_scoring` and
//! `risk_taxonomy` and stores per-company scores under `risks`; the canonical
//! one uses `theme_scoring`, `theme_taxonomy` and `themes`. `RawReport` tells
//! them apart once, at the boundary, and [`adapter::adapt`] turns either into
//! a [`CanonicalReport`]. Nothing downstream sees the legacy shape.

pub mod adapter;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use adapter::{adapt, adapt_value};

/// A score exactly as the service sent it, so exports round-trip unchanged.
///
/// Usually a JSON number; null and numeric strings are tolerated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(pub Value);

impl Score {
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Null, blank and zero scores are not displayed.
    pub fn is_shown(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::String(s) if s.trim().is_empty() => false,
            _ => self.as_f64() != Some(0.0),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Scores and commentary for one company, canonical shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    /// Theme/risk name to score.
    #[serde(default, deserialize_with = "null_as_default")]
    pub themes: BTreeMap<String, Score>,
    /// Attributes the dashboard does not interpret (sector, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompanyScore {
    /// Scores worth showing on a company card.
    pub fn shown_themes(&self) -> impl Iterator<Item = (&str, &Score)> {
        self.themes
            .iter()
            .filter(|(_, score)| score.is_shown())
            .map(|(name, score)| (name.as_str(), score))
    }
}

/// Identifier of a taxonomy node; the service emits integers, older dumps strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Number(i64),
    Text(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One node of the risk taxonomy tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaxonomyNode {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<TaxonomyNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single source excerpt supporting a risk determination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvidenceChunk {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub sub_scenario: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub risk_channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub risk_factor: Option<String>,
    #[serde(default, deserialize_with = "highlight_list")]
    pub highlights: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single report shape every renderer works with.
///
/// Each section is optional: a missing section renders as an empty state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_scoring: Option<BTreeMap<String, CompanyScore>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_taxonomy: Option<TaxonomyNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<EvidenceChunk>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalReport {
    /// Union of theme names across all companies, sorted for a stable column order.
    pub fn theme_columns(&self) -> Vec<&str> {
        let mut names = BTreeSet::new();
        for company in self.theme_scoring.iter().flat_map(|s| s.values()) {
            names.extend(company.themes.keys().map(String::as_str));
        }
        names.into_iter().collect()
    }

    pub fn company_count(&self) -> usize {
        self.theme_scoring.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn evidence_count(&self) -> usize {
        self.content.as_ref().map_or(0, Vec::len)
    }

    /// Company with the highest numeric composite score; ties go to the first name.
    pub fn top_company(&self) -> Option<(&str, &Score)> {
        self.theme_scoring
            .iter()
            .flat_map(|s| s.iter())
            .filter_map(|(name, c)| {
                let score = c.composite_score.as_ref()?;
                Some((name.as_str(), score, score.as_f64()?))
            })
            .fold(None, |best, (name, score, value)| match best {
                Some((_, _, top)) if top >= value => best,
                _ => Some((name, score, value)),
            })
            .map(|(name, score, _)| (name, score))
    }

    pub fn is_empty(&self) -> bool {
        self.theme_scoring.is_none() && self.theme_taxonomy.is_none() && self.content.is_none()
    }
}

/// Company entry in the legacy shape.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LegacyCompanyScore {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub composite_score: Option<Score>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub risks: Option<BTreeMap<String, Score>>,
    #[serde(default)]
    pub themes: Option<BTreeMap<String, Score>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Report in the legacy (`risk_*`) shape.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LegacyReport {
    #[serde(default)]
    pub risk_scoring: Option<BTreeMap<String, LegacyCompanyScore>>,
    #[serde(default, alias = "theme_taxonomy")]
    pub risk_taxonomy: Option<TaxonomyNode>,
    #[serde(default)]
    pub content: Option<Vec<EvidenceChunk>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A report as received, with its shape resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReport {
    Canonical(CanonicalReport),
    Legacy(LegacyReport),
}

impl RawReport {
    pub const CANONICAL_SCORING_FIELD: &'static str = "theme_scoring";

    /// Decide the shape by the presence of the canonical scoring field.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let Value::Object(map) = value else {
            return Err(crate::DashboardError::MalformedData(
                "report must be a JSON object".into(),
            ));
        };
        let canonical = map.contains_key(Self::CANONICAL_SCORING_FIELD);
        let value = Value::Object(map);
        let parsed = if canonical {
            serde_json::from_value(value).map(Self::Canonical)
        } else {
            serde_json::from_value(value).map(Self::Legacy)
        };
        parsed.map_err(|err| crate::DashboardError::MalformedData(err.to_string()))
    }
}

/// Null stands for "absent" wherever a collection is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.map(text_items))
}

fn highlight_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text_list(deserializer)?.unwrap_or_default())
}

/// Null items are dropped; numbers and booleans are kept as text.
fn text_items(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect()
}

/// Accept strings, numbers and booleans for text fields; null is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => Some(other.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text, found {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_is_detected_by_canonical_field() {
        let legacy = RawReport::from_value(json!({"risk_scoring": {}})).unwrap();
        assert!(matches!(legacy, RawReport::Legacy(_)));
        let canonical = RawReport::from_value(json!({"theme_scoring": {}})).unwrap();
        assert!(matches!(canonical, RawReport::Canonical(_)));
    }

    #[test]
    fn non_object_report_is_malformed() {
        let err = RawReport::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, crate::DashboardError::MalformedData(_)));
    }

    #[test]
    fn evidence_accepts_numeric_document_ids() {
        let chunk: EvidenceChunk =
            serde_json::from_value(json!({"document_id": 42, "headline": null})).unwrap();
        assert_eq!(chunk.document_id.as_deref(), Some("42"));
        assert!(chunk.headline.is_none());
        assert!(chunk.highlights.is_empty());
    }

    #[test]
    fn unknown_company_attributes_are_kept() {
        let company: CompanyScore = serde_json::from_value(json!({
            "ticker": "MSFT",
            "sector": "Technology",
            "themes": {"Demand Shift": 18}
        }))
        .unwrap();
        assert_eq!(company.extra["sector"], "Technology");
        let back = serde_json::to_value(&company).unwrap();
        assert_eq!(back["sector"], "Technology");
        assert_eq!(back["themes"]["Demand Shift"], json!(18));
    }

    #[test]
    fn theme_columns_are_the_union_across_companies() {
        let report: CanonicalReport = serde_json::from_value(json!({
            "theme_scoring": {
                "A": {"themes": {"Supply": 1, "Demand": 2}},
                "B": {"themes": {"Demand": 0, "Pricing": 3}}
            }
        }))
        .unwrap();
        assert_eq!(report.theme_columns(), vec!["Demand", "Pricing", "Supply"]);
    }

    #[test]
    fn top_company_prefers_highest_composite() {
        let report: CanonicalReport = serde_json::from_value(json!({
            "theme_scoring": {
                "A": {"composite_score": 40},
                "B": {"composite_score": 77},
                "C": {}
            }
        }))
        .unwrap();
        let (name, score) = report.top_company().unwrap();
        assert_eq!((name, score.as_f64()), ("B", Some(77.0)));
    }

    #[test]
    fn null_collections_read_as_empty() {
        let chunk: EvidenceChunk =
            serde_json::from_value(json!({"headline": "h", "highlights": null})).unwrap();
        assert!(chunk.highlights.is_empty());

        let node: TaxonomyNode =
            serde_json::from_value(json!({"label": null, "children": null, "keywords": null}))
                .unwrap();
        assert!(node.children.is_empty());
        assert_eq!(node.label, "");
        assert_eq!(node.keywords, None);

        let company: CompanyScore = serde_json::from_value(json!({"themes": null})).unwrap();
        assert!(company.themes.is_empty());
    }

    #[test]
    fn null_list_items_are_dropped() {
        let chunk: EvidenceChunk =
            serde_json::from_value(json!({"highlights": ["a", null, 3]})).unwrap();
        assert_eq!(chunk.highlights, vec!["a".to_string(), "3".to_string()]);
    }

    #[test]
    fn scores_keep_their_json_form() {
        let company: CompanyScore = serde_json::from_value(json!({
            "composite_score": 77,
            "themes": {"Int": 18, "Float": 2.5, "Missing": null, "Text": "7"}
        }))
        .unwrap();
        let back = serde_json::to_value(&company).unwrap();
        assert_eq!(
            back,
            json!({
                "composite_score": 77,
                "themes": {"Float": 2.5, "Int": 18, "Missing": null, "Text": "7"}
            })
        );
        assert_eq!(company.themes["Text"].as_f64(), Some(7.0));
        assert_eq!(company.themes["Int"].to_string(), "18");
        let shown: Vec<_> = company.shown_themes().map(|(name, _)| name).collect();
        assert_eq!(shown, vec!["Float", "Int", "Text"]);
    }
}
