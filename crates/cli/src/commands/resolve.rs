//! Offline feature vector resolution against a local model artifact

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::predictor::{
    load_classifier, FieldOutcome, ModelSource, PredictionService, RequestNormalizer,
    ResolutionReport,
};
use predictor_lib::{FeatureVector, PredictionRequest};
use serde_json::json;
use std::path::PathBuf;
use tabled::Tabled;

use crate::commands::predict::print_result;
use crate::output::{
    color_status, format_value, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Row for the resolved vector table
#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for the per-field resolution table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Target")]
    target: String,
}

/// Resolve a request against a model on disk, optionally scoring it
pub fn resolve(
    model: PathBuf,
    checksum: Option<String>,
    request: &PredictionRequest,
    with_prediction: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut source = ModelSource::new(model);
    if let Some(checksum) = checksum {
        source = source.with_checksum(checksum);
    }

    let classifier = load_classifier(&source)?;
    let service = PredictionService::new(classifier, RequestNormalizer::case_defaults())
        .with_context(|| format!("Model {:?} cannot serve case predictions", source.path))?;

    let (vector, report) = service.resolve(&request.to_fields())?;
    let prediction = if with_prediction {
        Some(service.predict_request(request)?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "model_version": service.model_version(),
            "vector": vector,
            "report": report,
            "prediction": prediction,
        }))?,
        OutputFormat::Table => {
            print_vector(service.schema().names(), &vector);
            println!();
            print_report(&report);
            if let Some(result) = &prediction {
                println!();
                print_result(request, result);
            }
        }
    }

    Ok(())
}

fn print_vector(names: &[String], vector: &FeatureVector) {
    println!("{}", "Feature Vector".bold());
    let rows: Vec<SlotRow> = names
        .iter()
        .zip(vector)
        .enumerate()
        .map(|(index, (feature, value))| SlotRow {
            index,
            feature: feature.clone(),
            value: format_value(*value),
        })
        .collect();
    print_table(&rows);
}

fn print_report(report: &ResolutionReport) {
    println!("{}", "Field Resolution".bold());
    let rows: Vec<FieldRow> = report
        .fields
        .iter()
        .map(|r| match &r.outcome {
            FieldOutcome::Placed { feature, index } => FieldRow {
                field: r.field.clone(),
                outcome: color_status("placed"),
                target: format!("{} [{}]", feature, index),
            },
            FieldOutcome::Unmatched { candidate } => FieldRow {
                field: r.field.clone(),
                outcome: color_status("unmatched"),
                target: candidate.clone(),
            },
        })
        .collect();
    print_table(&rows);

    if report.all_placed() {
        print_success("Every field matched a schema feature");
    } else {
        let unmatched: Vec<&str> = report.unmatched_fields().map(|r| r.field.as_str()).collect();
        print_warning(&format!(
            "{} field(s) left at zero: {}",
            unmatched.len(),
            unmatched.join(", ")
        ));
    }
}
