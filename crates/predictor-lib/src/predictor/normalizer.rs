//! Request normalization
//!
//! Validates a prediction request against the field table and splits it into
//! numeric pairs (placed by feature name) and categorical pairs (placed by
//! one-hot prefix). Pure: no I/O, no side effects.

use crate::error::PredictError;
use crate::models::PredictionRequest;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// How a request field maps onto the feature schema
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Number placed under `feature`
    Numeric {
        feature: String,
        min: Option<f64>,
        integer: bool,
    },
    /// Boolean placed under `feature` as 1.0 / 0.0
    Boolean { feature: String },
    /// Category placed at `"{prefix}{category}"`
    Categorical { prefix: String },
}

/// One required request field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn numeric(name: &str, feature: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric {
                feature: feature.to_string(),
                min: None,
                integer: false,
            },
        }
    }

    /// Non-negative whole number
    pub fn count(name: &str, feature: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric {
                feature: feature.to_string(),
                min: Some(0.0),
                integer: true,
            },
        }
    }

    pub fn boolean(name: &str, feature: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Boolean {
                feature: feature.to_string(),
            },
        }
    }

    pub fn categorical(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Categorical {
                prefix: prefix.to_string(),
            },
        }
    }
}

/// Numeric request value bound to a schema feature name
#[derive(Debug, Clone, PartialEq)]
pub struct NumericPair {
    pub field: String,
    pub feature: String,
    pub value: f64,
}

/// Categorical request value bound to a one-hot prefix
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalPair {
    pub field: String,
    pub prefix: String,
    pub category: String,
}

impl CategoricalPair {
    /// Schema name this category would have been encoded under
    pub fn candidate(&self) -> String {
        format!("{}{}", self.prefix, self.category)
    }
}

/// Validated request, ready for vector resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRequest {
    pub numeric: Vec<NumericPair>,
    pub categorical: Vec<CategoricalPair>,
}

/// Validates requests against a fixed field table
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    fields: Vec<FieldSpec>,
}

impl Default for RequestNormalizer {
    fn default() -> Self {
        Self::case_defaults()
    }
}

impl RequestNormalizer {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Field table the case outcome model is trained with
    pub fn case_defaults() -> Self {
        Self::new(vec![
            FieldSpec::count("client_age", "age"),
            FieldSpec::boolean("escalated", "escalated"),
            FieldSpec::count("days_open", "resolution_days"),
            FieldSpec::categorical("case_type", "case_type_"),
            FieldSpec::categorical("complexity", "complexity_"),
            FieldSpec::categorical("client_income_level", "income_level_"),
        ])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate a JSON field map
    pub fn normalize(&self, payload: &Map<String, Value>) -> Result<NormalizedRequest, PredictError> {
        let mut normalized = NormalizedRequest::default();

        for spec in &self.fields {
            let value = match payload.get(&spec.name) {
                None | Some(Value::Null) => {
                    return Err(PredictError::validation(&spec.name, "field is required"));
                }
                Some(value) => value,
            };

            match &spec.kind {
                FieldKind::Numeric {
                    feature,
                    min,
                    integer,
                } => {
                    let number = value.as_f64().ok_or_else(|| {
                        PredictError::validation(
                            &spec.name,
                            format!("expected a number, got {}", json_kind(value)),
                        )
                    })?;
                    check_number(&spec.name, number, *min, *integer)?;
                    normalized.numeric.push(NumericPair {
                        field: spec.name.clone(),
                        feature: feature.clone(),
                        value: number,
                    });
                }
                FieldKind::Boolean { feature } => {
                    let flag = value.as_bool().ok_or_else(|| {
                        PredictError::validation(
                            &spec.name,
                            format!("expected a boolean, got {}", json_kind(value)),
                        )
                    })?;
                    normalized.numeric.push(NumericPair {
                        field: spec.name.clone(),
                        feature: feature.clone(),
                        value: if flag { 1.0 } else { 0.0 },
                    });
                }
                FieldKind::Categorical { prefix } => {
                    let category = value.as_str().ok_or_else(|| {
                        PredictError::validation(
                            &spec.name,
                            format!("expected a string, got {}", json_kind(value)),
                        )
                    })?;
                    if category.trim().is_empty() {
                        return Err(PredictError::validation(&spec.name, "must not be empty"));
                    }
                    normalized.categorical.push(CategoricalPair {
                        field: spec.name.clone(),
                        prefix: prefix.clone(),
                        category: category.to_string(),
                    });
                }
            }
        }

        Ok(normalized)
    }

    pub fn normalize_request(
        &self,
        request: &PredictionRequest,
    ) -> Result<NormalizedRequest, PredictError> {
        self.normalize(&request.to_fields())
    }

    /// Validate query-string parameters, coercing each value by field kind
    pub fn normalize_query(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<NormalizedRequest, PredictError> {
        let mut payload = Map::new();

        for spec in &self.fields {
            let Some(raw) = params.get(&spec.name) else {
                continue;
            };
            let value = match &spec.kind {
                FieldKind::Numeric { .. } => {
                    let number: f64 = raw.trim().parse().map_err(|_| {
                        PredictError::validation(
                            &spec.name,
                            format!("expected a number, got `{}`", raw),
                        )
                    })?;
                    serde_json::Number::from_f64(number)
                        .map(Value::Number)
                        .ok_or_else(|| PredictError::validation(&spec.name, "must be finite"))?
                }
                FieldKind::Boolean { .. } => match raw.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Value::Bool(true),
                    "false" | "0" => Value::Bool(false),
                    _ => {
                        return Err(PredictError::validation(
                            &spec.name,
                            format!("expected a boolean, got `{}`", raw),
                        ))
                    }
                },
                FieldKind::Categorical { .. } => Value::String(raw.clone()),
            };
            payload.insert(spec.name.clone(), value);
        }

        self.normalize(&payload)
    }
}

fn check_number(field: &str, value: f64, min: Option<f64>, integer: bool) -> Result<(), PredictError> {
    if !value.is_finite() {
        return Err(PredictError::validation(field, "must be finite"));
    }
    if integer && value.fract() != 0.0 {
        return Err(PredictError::validation(
            field,
            format!("expected a whole number, got {}", value),
        ));
    }
    if let Some(min) = min {
        if value < min {
            return Err(PredictError::validation(
                field,
                format!("must be >= {}, got {}", min, value),
            ));
        }
    }
    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn family_law() -> Map<String, Value> {
        payload(json!({
            "case_type": "Family Law",
            "complexity": "Medium",
            "client_age": 35,
            "client_income_level": "Medium",
            "days_open": 30,
            "escalated": false
        }))
    }

    #[test]
    fn test_normalize_splits_pairs() {
        let normalized = RequestNormalizer::case_defaults()
            .normalize(&family_law())
            .unwrap();

        let numeric: Vec<_> = normalized
            .numeric
            .iter()
            .map(|p| (p.feature.as_str(), p.value))
            .collect();
        assert_eq!(
            numeric,
            vec![("age", 35.0), ("escalated", 0.0), ("resolution_days", 30.0)]
        );

        let candidates: Vec<_> = normalized.categorical.iter().map(|p| p.candidate()).collect();
        assert_eq!(
            candidates,
            vec!["case_type_Family Law", "complexity_Medium", "income_level_Medium"]
        );
    }

    #[test]
    fn test_boolean_maps_to_one() {
        let mut fields = family_law();
        fields.insert("escalated".to_string(), json!(true));
        let normalized = RequestNormalizer::case_defaults().normalize(&fields).unwrap();
        let escalated = normalized
            .numeric
            .iter()
            .find(|p| p.field == "escalated")
            .unwrap();
        assert_eq!(escalated.value, 1.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut fields = family_law();
        fields.remove("case_type");
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("case_type"));
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_null_field_rejected() {
        let mut fields = family_law();
        fields.insert("days_open".to_string(), Value::Null);
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("days_open"));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut fields = family_law();
        fields.insert("client_age".to_string(), json!("thirty-five"));
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("client_age"));
        assert!(err.to_string().contains("expected a number"));

        let mut fields = family_law();
        fields.insert("escalated".to_string(), json!(1));
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("escalated"));
    }

    #[test]
    fn test_negative_days_open_rejected() {
        let mut fields = family_law();
        fields.insert("days_open".to_string(), json!(-3));
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("days_open"));
    }

    #[test]
    fn test_fractional_age_rejected() {
        let mut fields = family_law();
        fields.insert("client_age".to_string(), json!(35.5));
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("client_age"));

        fields.insert("client_age".to_string(), json!(35.0));
        assert!(RequestNormalizer::case_defaults().normalize(&fields).is_ok());
    }

    #[test]
    fn test_blank_category_rejected() {
        let mut fields = family_law();
        fields.insert("case_type".to_string(), json!("   "));
        let err = RequestNormalizer::case_defaults().normalize(&fields).unwrap_err();
        assert_eq!(err.field(), Some("case_type"));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut fields = family_law();
        fields.insert("assignee".to_string(), json!("Agent1"));
        let normalized = RequestNormalizer::case_defaults().normalize(&fields).unwrap();
        assert_eq!(normalized.numeric.len() + normalized.categorical.len(), 6);
    }

    #[test]
    fn test_query_coercion() {
        let params: HashMap<String, String> = [
            ("case_type", "Criminal"),
            ("complexity", "High"),
            ("client_age", "52"),
            ("client_income_level", "Low"),
            ("days_open", "12"),
            ("escalated", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let normalized = RequestNormalizer::case_defaults()
            .normalize_query(&params)
            .unwrap();
        assert_eq!(normalized.numeric[0].value, 52.0);
        assert_eq!(normalized.numeric[1].value, 1.0);
        assert_eq!(normalized.categorical[0].category, "Criminal");
    }

    #[test]
    fn test_query_bad_number_rejected() {
        let params: HashMap<String, String> = [("client_age", "old")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let err = RequestNormalizer::case_defaults()
            .normalize_query(&params)
            .unwrap_err();
        assert_eq!(err.field(), Some("client_age"));
    }

    #[test]
    fn test_query_missing_field_rejected() {
        let params = HashMap::new();
        let err = RequestNormalizer::case_defaults()
            .normalize_query(&params)
            .unwrap_err();
        assert_eq!(err.field(), Some("client_age"));
    }
}
