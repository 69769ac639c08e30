//! Online prediction command

use anyhow::Result;
use colored::Colorize;
use predictor_lib::predictor::OutputFormatter;
use predictor_lib::{PredictionRequest, PredictionResult};

use crate::client::ApiClient;
use crate::output::{color_probability, print_json, print_warning, OutputFormat};

/// Ask the service for a case outcome
pub async fn predict(
    client: &ApiClient,
    request: &PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: PredictionResult = client.post("predict", request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_result(request, &result),
    }

    Ok(())
}

pub(crate) fn print_result(request: &PredictionRequest, result: &PredictionResult) {
    println!("{}", "Case Outcome Prediction".bold());
    println!("{}", "=".repeat(40));
    println!("Case Type:    {}", request.case_type.cyan());
    println!("Complexity:   {}", request.complexity);
    println!("Days Open:    {}", request.days_open);
    println!("Escalated:    {}", if request.escalated { "yes" } else { "no" });
    println!();
    println!("Prediction:   {}", result.prediction.bold());
    println!("Probability:  {}", color_probability(result.probability));

    if OutputFormatter::new().is_low_confidence(result) {
        println!();
        print_warning("Low confidence prediction; treat as indicative only");
    }
}
