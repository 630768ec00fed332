//! Prediction command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, Prediction};
use crate::output::{color_rul, format_timestamp, OutputFormat};

/// Request one RUL prediction and render it
pub async fn run(
    client: &ApiClient,
    zone: &str,
    equipment: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/predict?zone_id={zone}&equipment_id={equipment}");
    let prediction: Prediction = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        OutputFormat::Plain => {
            println!("{}", "RUL Prediction".bold());
            println!("{}", "=".repeat(50));
            println!("Zone:                   {}", prediction.zone_id.cyan());
            println!("Equipment:              {}", prediction.equipment_id.cyan());
            println!(
                "Remaining useful life:  {}",
                color_rul(prediction.rul_estimate)
            );
            println!("Model version:          {}", prediction.model_version);
            println!(
                "Observed at:            {}",
                format_timestamp(&prediction.observed_at).dimmed()
            );
        }
    }

    Ok(())
}
