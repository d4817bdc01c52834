//! Form input and the validated payload sent to the submit endpoint.
//!
//! `AnalysisForm` mirrors the raw text fields a user fills in; `AnalysisRequest`
//! is what goes over the wire. `AnalysisForm::validate` is the only way to get
//! from one to the other, so every payload has passed the client-side checks.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const DEFAULT_LLM_MODEL: &str = "openai::gpt-4o-mini";
pub const DEFAULT_DOCUMENT_TYPE: &str = "NEWS";

/// Length of a single entity identifier.
const ENTITY_ID_LEN: usize = 6;

/// Reporting frequency of the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "3M",
            Self::Yearly => "Y",
        }
    }

    /// Minimum inclusive span, in days, a date range must cover for this frequency.
    pub fn min_days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(Self::Daily),
            "W" => Ok(Self::Weekly),
            "M" => Ok(Self::Monthly),
            "3M" => Ok(Self::Quarterly),
            "Y" => Ok(Self::Yearly),
            _ => Err(ValidationError::UnknownFrequency {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A backend-managed group of companies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchlist {
    pub id: &'static str,
    pub name: &'static str,
}

/// Watchlists users may reference by display name instead of id.
pub const KNOWN_WATCHLISTS: &[Watchlist] = &[
    Watchlist {
        id: "814d0944-a2c1-44f6-8b42-a70c0795428e",
        name: "Magnificent 7",
    },
    Watchlist {
        id: "beda15f2-b3ba-44dd-80c6-79d8a1bba764",
        name: "Militarization",
    },
    Watchlist {
        id: "eea133f7-ddc6-44bd-bd66-72f1e31dd7db",
        name: "Health and Wellness Stocks",
    },
    Watchlist {
        id: "f7801965-ed54-4ff1-b524-b4ecee3bc858",
        name: "High Finance Stocks",
    },
    Watchlist {
        id: "74cff065-9b00-4f6c-8690-5dff8cbbf3e8",
        name: "FinTech Innovators",
    },
    Watchlist {
        id: "db8478c9-34db-4975-8e44-b1ff764098ac",
        name: "AI Szn",
    },
];

/// Companies to analyse: explicit entity ids or an opaque watchlist id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CompanyUniverse {
    Entities(Vec<String>),
    Watchlist(String),
}

impl CompanyUniverse {
    /// Interpret the raw form value.
    ///
    /// A known watchlist name resolves to its id first. Then: any comma makes
    /// a list, exactly six characters is a single entity id, anything longer
    /// is a watchlist id.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingCompanies);
        }
        let value = KNOWN_WATCHLISTS
            .iter()
            .find(|w| w.name == trimmed)
            .map(|w| w.id)
            .unwrap_or(trimmed);

        if value.contains(',') {
            let ids: Vec<String> = split_list(value);
            if ids.is_empty() {
                return Err(ValidationError::MissingCompanies);
            }
            return Ok(Self::Entities(ids));
        }
        match value.chars().count() {
            ENTITY_ID_LEN => Ok(Self::Entities(vec![value.to_string()])),
            n if n > ENTITY_ID_LEN => Ok(Self::Watchlist(value.to_string())),
            _ => Err(ValidationError::InvalidCompanies {
                value: value.to_string(),
            }),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Entities(ids) => ids.join(", "),
            Self::Watchlist(id) => KNOWN_WATCHLISTS
                .iter()
                .find(|w| w.id == id)
                .map(|w| w.name.to_string())
                .unwrap_or_else(|| id.clone()),
        }
    }
}

/// Fiscal year filter: one value or several, kept as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FiscalYear {
    Single(String),
    Many(Vec<String>),
}

impl FiscalYear {
    fn parse(raw: &str) -> Result<Option<Self>, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let invalid = || ValidationError::InvalidFiscalYear {
            value: trimmed.to_string(),
        };
        if trimmed.contains(',') {
            let years = split_list(trimmed);
            if years.is_empty() || !years.iter().all(|y| is_number(y)) {
                return Err(invalid());
            }
            return Ok(Some(Self::Many(years)));
        }
        if !is_number(trimmed) {
            return Err(invalid());
        }
        Ok(Some(Self::Single(trimmed.to_string())))
    }
}

/// Raw values as entered in the analysis form. Blank means "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisForm {
    pub theme: String,
    pub focus: String,
    pub companies: String,
    pub start_date: String,
    pub end_date: String,
    pub frequency: String,
    pub fiscal_year: String,
    pub llm_model: String,
    pub document_type: String,
    pub rerank_threshold: String,
    pub document_limit: String,
    pub batch_size: String,
    pub control_entities: String,
    pub keywords: String,
}

impl AnalysisForm {
    /// Run every client-side check and build the submit payload.
    pub fn validate(&self) -> Result<AnalysisRequest, ValidationError> {
        let main_theme = self.theme.trim();
        if main_theme.is_empty() {
            return Err(ValidationError::MissingTheme);
        }

        let frequency = match self.frequency.trim() {
            "" => Frequency::default(),
            other => other.parse()?,
        };
        let (start_date, end_date) =
            validate_date_range(&self.start_date, &self.end_date, frequency)?;

        let companies = CompanyUniverse::parse(&self.companies)?;
        let fiscal_year = FiscalYear::parse(&self.fiscal_year)?;
        let control_entities = parse_control_entities(&self.control_entities)?;

        let keywords = split_list(&self.keywords);

        Ok(AnalysisRequest {
            main_theme: main_theme.to_string(),
            focus: self.focus.trim().to_string(),
            companies,
            llm_model: non_blank(&self.llm_model).unwrap_or(DEFAULT_LLM_MODEL).to_string(),
            document_type: non_blank(&self.document_type)
                .unwrap_or(DEFAULT_DOCUMENT_TYPE)
                .to_string(),
            frequency,
            start_date,
            end_date,
            fiscal_year,
            rerank_threshold: parse_number("rerank_threshold", &self.rerank_threshold)?,
            document_limit: parse_number("document_limit", &self.document_limit)?,
            batch_size: parse_number("batch_size", &self.batch_size)?,
            control_entities,
            keywords: (!keywords.is_empty()).then_some(keywords),
        })
    }
}

/// Validated JSON body for `POST /risk-analysis`. Optional fields are omitted, never null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub main_theme: String,
    pub focus: String,
    pub companies: CompanyUniverse,
    pub llm_model: String,
    pub document_type: String,
    pub frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<FiscalYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_entities: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

/// Check the optional date range against the chosen frequency.
///
/// The span is inclusive: 2024-01-01..2024-01-30 covers 30 days.
pub fn validate_date_range(
    start: &str,
    end: &str,
    frequency: Frequency,
) -> Result<(Option<String>, Option<String>), ValidationError> {
    let start_date = parse_date("start_date", start)?;
    let end_date = parse_date("end_date", end)?;

    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s > e {
            return Err(ValidationError::StartAfterEnd {
                start: s.to_string(),
                end: e.to_string(),
            });
        }
        let days = (e - s).num_days() + 1;
        if days < frequency.min_days() {
            return Err(ValidationError::RangeTooShort {
                start: s.to_string(),
                end: e.to_string(),
                days,
                frequency: frequency.to_string(),
                min_days: frequency.min_days(),
            });
        }
    }
    Ok((
        start_date.map(|d| d.format("%Y-%m-%d").to_string()),
        end_date.map(|d| d.format("%Y-%m-%d").to_string()),
    ))
}

fn parse_date(field: &'static str, raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// Parse the control-entities field, accepting single-quoted JSON.
fn parse_control_entities(raw: &str) -> Result<Option<Map<String, Value>>, ValidationError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    let normalized = value.replace('\'', "\"");
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(ValidationError::InvalidControlEntities {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(err) => Err(ValidationError::InvalidControlEntities {
            reason: err.to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<Option<T>, ValidationError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_number(token: &str) -> bool {
    token.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(companies: &str) -> AnalysisForm {
        AnalysisForm {
            theme: "Energy".into(),
            companies: companies.into(),
            ..AnalysisForm::default()
        }
    }

    #[test]
    fn six_character_id_becomes_single_entry_list() {
        let request = form("ABCDEF").validate().unwrap();
        let payload = serde_json::to_value(&request).unwrap();
        assert_eq!(payload["companies"], json!(["ABCDEF"]));
    }

    #[test]
    fn comma_separated_ids_become_list() {
        let request = form("ABCDEF, GHIJKL,").validate().unwrap();
        assert_eq!(
            request.companies,
            CompanyUniverse::Entities(vec!["ABCDEF".into(), "GHIJKL".into()])
        );
    }

    #[test]
    fn long_value_without_comma_is_watchlist_id() {
        let request = form("wl-12345-long-id").validate().unwrap();
        let payload = serde_json::to_value(&request).unwrap();
        assert_eq!(payload["companies"], json!("wl-12345-long-id"));
    }

    #[test]
    fn known_watchlist_name_resolves_to_id() {
        let request = form("Magnificent 7").validate().unwrap();
        assert_eq!(
            request.companies,
            CompanyUniverse::Watchlist("814d0944-a2c1-44f6-8b42-a70c0795428e".into())
        );
        assert_eq!(request.companies.summary(), "Magnificent 7");
    }

    #[test]
    fn blank_universe_is_rejected() {
        assert_eq!(form("   ").validate(), Err(ValidationError::MissingCompanies));
    }

    #[test]
    fn short_universe_is_rejected() {
        assert!(matches!(
            form("ABC").validate(),
            Err(ValidationError::InvalidCompanies { value }) if value == "ABC"
        ));
    }

    #[test]
    fn blank_theme_is_rejected() {
        let mut f = form("ABCDEF");
        f.theme = " ".into();
        assert_eq!(f.validate(), Err(ValidationError::MissingTheme));
    }

    #[test]
    fn fiscal_year_list_is_split_and_trimmed() {
        let mut f = form("ABCDEF");
        f.fiscal_year = "2021, 2022".into();
        let payload = serde_json::to_value(f.validate().unwrap()).unwrap();
        assert_eq!(payload["fiscal_year"], json!(["2021", "2022"]));
    }

    #[test]
    fn non_numeric_fiscal_year_is_rejected() {
        let mut f = form("ABCDEF");
        f.fiscal_year = "abc".into();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidFiscalYear { .. })
        ));
        f.fiscal_year = "2021, abc".into();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidFiscalYear { .. })
        ));
    }

    #[test]
    fn control_entities_accept_single_quotes() {
        let mut f = form("ABCDEF");
        f.control_entities = "{'place': ['China']}".into();
        let request = f.validate().unwrap();
        let entities = request.control_entities.unwrap();
        assert_eq!(entities["place"], json!(["China"]));
    }

    #[test]
    fn invalid_control_entities_are_a_validation_error() {
        let mut f = form("ABCDEF");
        f.control_entities = "{place: China".into();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidControlEntities { .. })
        ));
        f.control_entities = "['China']".into();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidControlEntities { reason }) if reason.contains("array")
        ));
    }

    #[test]
    fn optional_fields_are_omitted_and_defaults_applied() {
        let payload = serde_json::to_value(form("ABCDEF").validate().unwrap()).unwrap();
        let obj = payload.as_object().unwrap();
        assert_eq!(obj["main_theme"], "Energy");
        assert_eq!(obj["llm_model"], DEFAULT_LLM_MODEL);
        assert_eq!(obj["document_type"], "NEWS");
        assert_eq!(obj["frequency"], "M");
        for key in [
            "start_date",
            "end_date",
            "fiscal_year",
            "rerank_threshold",
            "document_limit",
            "batch_size",
            "control_entities",
            "keywords",
        ] {
            assert!(!obj.contains_key(key), "{key} should be omitted");
        }
    }

    #[test]
    fn numeric_tuning_parameters_are_parsed() {
        let mut f = form("ABCDEF");
        f.rerank_threshold = "0.7".into();
        f.document_limit = "50".into();
        f.batch_size = "5".into();
        let request = f.validate().unwrap();
        assert_eq!(request.rerank_threshold, Some(0.7));
        assert_eq!(request.document_limit, Some(50));
        assert_eq!(request.batch_size, Some(5));

        f.batch_size = "ten".into();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidNumber { field: "batch_size", .. })
        ));
    }

    #[test]
    fn date_range_must_be_ordered() {
        let err = validate_date_range("2024-03-01", "2024-02-01", Frequency::Daily).unwrap_err();
        assert!(matches!(err, ValidationError::StartAfterEnd { .. }));
    }

    #[test]
    fn date_range_must_cover_frequency_minimum() {
        assert!(validate_date_range("2024-01-01", "2024-01-30", Frequency::Monthly).is_ok());
        let err =
            validate_date_range("2024-01-01", "2024-01-29", Frequency::Monthly).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::RangeTooShort { days: 29, min_days: 30, .. }
        ));
        assert!(validate_date_range("2024-01-01", "2024-01-06", Frequency::Weekly).is_err());
    }

    #[test]
    fn single_or_missing_dates_skip_range_checks() {
        let (start, end) = validate_date_range("2024-01-01", "", Frequency::Yearly).unwrap();
        assert_eq!(start.as_deref(), Some("2024-01-01"));
        assert!(end.is_none());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = validate_date_range("01/02/2024", "", Frequency::Daily).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate { field: "start_date", .. }));
    }

    #[test]
    fn frequency_codes_round_trip() {
        for code in ["D", "W", "M", "3M", "Y"] {
            let freq: Frequency = code.parse().unwrap();
            assert_eq!(freq.code(), code);
        }
        assert!("Q".parse::<Frequency>().is_err());
    }
}
