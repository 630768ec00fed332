//! Retrain trigger command

use anyhow::Result;

use crate::client::{ApiClient, RetrainOutcome, RetrainRequest};
use crate::output::{print_info, print_success, print_warning, OutputFormat};

/// Trigger one retrain cycle and render the outcome
pub async fn run(
    client: &ApiClient,
    month: Option<String>,
    sample_limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(month) = &month {
        print_info(&format!("Triggering retrain for {month}"));
    } else {
        print_info("Triggering retrain for the current month");
    }

    let request = RetrainRequest {
        month,
        sample_limit,
    };
    let outcome: RetrainOutcome = client.post("api/v1/retrain", &request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => match outcome.status.as_str() {
            "published" => {
                print_success(&format!(
                    "Published {} ({} training rows)",
                    outcome.version.as_deref().unwrap_or("unknown"),
                    outcome
                        .trained_rows
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                ));
                if let Some(metrics) = &outcome.metrics {
                    println!(
                        "  rmse={:.3}  mae={:.3}  r2={:.3}",
                        metrics.rmse, metrics.mae, metrics.r2
                    );
                }
            }
            "skipped" => {
                print_warning(&format!(
                    "Skipped: {} distinct days of data, {} required",
                    outcome.observed_days.unwrap_or(0),
                    outcome.required_days.unwrap_or(0),
                ));
            }
            other => {
                print_warning(&format!("Unexpected outcome: {other}"));
            }
        },
    }

    Ok(())
}
