//! Model and service status commands

use anyhow::Result;
use colored::Colorize;
use predictor_lib::{HealthResponse, ModelInfo, ReadinessResponse};
use serde_json::json;
use tabled::Tabled;

use crate::client::{ApiClient, ServiceStatus};
use crate::output::{color_status, print_info, print_json, print_table, OutputFormat};

/// Row for the feature importance table
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show the loaded model and its feature schema
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info: ModelInfo = client.get("model-info").await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Model Info".bold());
            println!("{}", "=".repeat(50));
            println!("Type:      {}", info.model_type.cyan());
            println!("Version:   {}", info.model_version.cyan());
            println!("Classes:   {}", info.classes.join(", "));
            println!("Features:  {}", info.n_features);
            println!();

            match &info.feature_importances {
                Some(ranked) => {
                    let rows: Vec<ImportanceRow> = ranked
                        .iter()
                        .enumerate()
                        .map(|(i, f)| ImportanceRow {
                            rank: i + 1,
                            feature: f.feature.clone(),
                            importance: format!("{:.4}", f.importance),
                        })
                        .collect();
                    print_table(&rows);
                }
                None => {
                    print_info("Model carries no feature importances");
                    for (i, name) in info.features.iter().enumerate() {
                        println!("  {:>3}  {}", i, name);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Show liveness and readiness of the service
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: ServiceStatus = client.get("").await?;
    let (_, health): (bool, HealthResponse) = client.get_any_status("healthz").await?;
    let (_, readiness): (bool, ReadinessResponse) = client.get_any_status("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "service": status,
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Service:   {}", color_status(&status.status));
            if let Some(version) = &status.model_version {
                println!("Model:     {}", version.cyan());
            }
            let health_status = serde_json::to_value(health.status)?;
            println!(
                "Health:    {}",
                color_status(health_status.as_str().unwrap_or("unknown"))
            );
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!("Readiness: {}", color_status(ready));
            if let Some(reason) = &readiness.reason {
                println!("Reason:    {}", reason);
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| {
                    let status = serde_json::to_value(c.status)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    ComponentRow {
                        name: name.clone(),
                        status: color_status(&status),
                        message: c.message.clone().unwrap_or_default(),
                    }
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);
        }
    }

    Ok(())
}
