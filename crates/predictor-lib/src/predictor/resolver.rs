//! Feature vector resolution
//!
//! Places normalized request values into the exact positions a trained model
//! reads. Fields with no matching schema name are left out of the vector and
//! recorded in the report. For categorical fields this is the unseen-category
//! representation: every one-hot slot of the prefix stays at 0.0.

use super::normalizer::NormalizedRequest;
use super::FeatureSchema;
use crate::error::PredictError;
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a request field ended up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldOutcome {
    Placed { feature: String, index: usize },
    Unmatched { candidate: String },
}

/// Resolution outcome for one request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub field: String,
    #[serde(flatten)]
    pub outcome: FieldOutcome,
}

/// Per-field record of a resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub fields: Vec<FieldResolution>,
}

impl ResolutionReport {
    fn placed(&mut self, field: &str, feature: &str, index: usize) {
        self.fields.push(FieldResolution {
            field: field.to_string(),
            outcome: FieldOutcome::Placed {
                feature: feature.to_string(),
                index,
            },
        });
    }

    fn unmatched(&mut self, field: &str, candidate: String) {
        self.fields.push(FieldResolution {
            field: field.to_string(),
            outcome: FieldOutcome::Unmatched { candidate },
        });
    }

    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|r| r.field == field)
            .map(|r| &r.outcome)
    }

    pub fn is_unmatched(&self, field: &str) -> bool {
        matches!(self.outcome(field), Some(FieldOutcome::Unmatched { .. }))
    }

    /// Fields dropped from the vector, in request-table order
    pub fn unmatched_fields(&self) -> impl Iterator<Item = &FieldResolution> {
        self.fields
            .iter()
            .filter(|r| matches!(r.outcome, FieldOutcome::Unmatched { .. }))
    }

    pub fn all_placed(&self) -> bool {
        self.unmatched_fields().next().is_none()
    }
}

/// Builds model-aligned feature vectors from a shared schema
#[derive(Debug, Clone)]
pub struct VectorResolver {
    schema: Arc<FeatureSchema>,
}

impl VectorResolver {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn resolve(
        &self,
        request: &NormalizedRequest,
    ) -> Result<(FeatureVector, ResolutionReport), PredictError> {
        let mut vector = vec![0.0; self.schema.len()];
        // Request field that wrote each slot
        let mut writers: Vec<Option<&str>> = vec![None; self.schema.len()];
        let mut report = ResolutionReport::default();

        for pair in &request.numeric {
            match self.schema.index_of(&pair.feature) {
                Some(index) => {
                    claim(&mut writers, index, &pair.field, &pair.feature)?;
                    vector[index] = pair.value;
                    report.placed(&pair.field, &pair.feature, index);
                }
                None => report.unmatched(&pair.field, pair.feature.clone()),
            }
        }

        for pair in &request.categorical {
            let candidate = pair.candidate();
            match self.schema.index_of(&candidate) {
                Some(index) => {
                    claim(&mut writers, index, &pair.field, &candidate)?;
                    vector[index] = 1.0;
                    report.placed(&pair.field, &candidate, index);
                }
                None => report.unmatched(&pair.field, candidate),
            }
        }

        debug_assert_eq!(vector.len(), self.schema.len());
        Ok((vector, report))
    }
}

fn claim<'a>(
    writers: &mut [Option<&'a str>],
    index: usize,
    field: &'a str,
    feature: &str,
) -> Result<(), PredictError> {
    if let Some(previous) = writers[index] {
        return Err(PredictError::schema_integrity(
            feature,
            format!("fields `{}` and `{}` both resolve to position {}", previous, field, index),
        ));
    }
    writers[index] = Some(field);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::normalizer::{FieldSpec, RequestNormalizer};
    use serde_json::{json, Map, Value};

    fn schema() -> Arc<FeatureSchema> {
        let names = [
            "age",
            "escalated",
            "resolution_days",
            "case_type_Family Law",
            "case_type_Criminal",
            "complexity_Medium",
        ];
        Arc::new(FeatureSchema::from_names(names.iter().map(|s| s.to_string()).collect()).unwrap())
    }

    fn request(case_type: &str) -> Map<String, Value> {
        match json!({
            "case_type": case_type,
            "complexity": "Medium",
            "client_age": 35,
            "client_income_level": "Medium",
            "days_open": 30,
            "escalated": false
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn resolve(case_type: &str) -> (FeatureVector, ResolutionReport) {
        let normalized = RequestNormalizer::case_defaults()
            .normalize(&request(case_type))
            .unwrap();
        VectorResolver::new(schema()).resolve(&normalized).unwrap()
    }

    #[test]
    fn test_family_law_vector() {
        let (vector, report) = resolve("Family Law");
        assert_eq!(vector, vec![35.0, 0.0, 30.0, 1.0, 0.0, 1.0]);
        assert!(report.is_unmatched("client_income_level"));
        assert_eq!(report.unmatched_fields().count(), 1);
        assert_eq!(
            report.outcome("client_income_level"),
            Some(&FieldOutcome::Unmatched {
                candidate: "income_level_Medium".to_string()
            })
        );
        assert_eq!(
            report.outcome("case_type"),
            Some(&FieldOutcome::Placed {
                feature: "case_type_Family Law".to_string(),
                index: 3
            })
        );
    }

    #[test]
    fn test_unseen_category_leaves_slots_zero() {
        let (vector, report) = resolve("Immigration");
        let schema = schema();
        for index in schema.one_hot_indices("case_type_") {
            assert_eq!(vector[index], 0.0);
        }
        assert!(report.is_unmatched("case_type"));
        assert_eq!(vector.len(), schema.len());
    }

    #[test]
    fn test_numeric_fields_take_request_values() {
        let (vector, _) = resolve("Criminal");
        let schema = schema();
        assert_eq!(vector[schema.index_of("age").unwrap()], 35.0);
        assert_eq!(vector[schema.index_of("resolution_days").unwrap()], 30.0);
        assert_eq!(vector[schema.index_of("escalated").unwrap()], 0.0);
        assert_eq!(vector[schema.index_of("case_type_Criminal").unwrap()], 1.0);
    }

    #[test]
    fn test_numeric_feature_missing_from_schema() {
        let schema = Arc::new(
            FeatureSchema::from_names(vec!["escalated".to_string(), "complexity_Low".to_string()])
                .unwrap(),
        );
        let normalized = RequestNormalizer::case_defaults()
            .normalize(&request("Criminal"))
            .unwrap();
        let (vector, report) = VectorResolver::new(schema).resolve(&normalized).unwrap();
        assert_eq!(vector, vec![0.0, 0.0]);
        assert!(report.is_unmatched("client_age"));
        assert!(report.is_unmatched("days_open"));
        assert!(!report.is_unmatched("escalated"));
        assert!(!report.all_placed());
    }

    #[test]
    fn test_two_fields_on_one_slot_fail_loudly() {
        let normalizer = RequestNormalizer::new(vec![
            FieldSpec::count("client_age", "age"),
            FieldSpec::count("days_open", "age"),
        ]);
        let normalized = normalizer.normalize(&request("Criminal")).unwrap();
        let err = VectorResolver::new(schema()).resolve(&normalized).unwrap_err();
        match err {
            PredictError::SchemaIntegrity { feature, detail } => {
                assert_eq!(feature, "age");
                assert!(detail.contains("client_age") && detail.contains("days_open"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_report_serializes_outcome_tag() {
        let (_, report) = resolve("Family Law");
        let json = serde_json::to_value(&report).unwrap();
        let income = json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["field"] == "client_income_level")
            .unwrap();
        assert_eq!(income["outcome"], "unmatched");
        assert_eq!(income["candidate"], "income_level_Medium");
    }
}
