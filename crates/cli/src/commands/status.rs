//! Service status command

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::client::{ApiClient, Readiness, ServiceHealth};
use crate::output::{color_status, OutputFormat};

/// Show service health, readiness, and per-component detail
pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: ServiceHealth = client.get("healthz").await?;
    let readiness: Readiness = client.get("readyz").await.unwrap_or(Readiness {
        ready: false,
        reason: Some("readiness probe failed".to_string()),
    });

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "health": health,
                    "readiness": readiness,
                }))?
            );
        }
        OutputFormat::Plain => {
            println!("{}", "Service Status".bold());
            println!("{}", "=".repeat(50));
            println!("Overall:                {}", color_status(&health.status));
            let ready = if readiness.ready {
                "ready".green().to_string()
            } else {
                "not ready".red().to_string()
            };
            println!("Serving:                {ready}");
            if let Some(reason) = &readiness.reason {
                println!("Reason:                 {}", reason.dimmed());
            }
            println!();

            let mut names: Vec<&String> = health.components.keys().collect();
            names.sort();
            for name in names {
                let component = &health.components[name];
                let detail = component
                    .message
                    .as_deref()
                    .map(|m| format!(" ({m})"))
                    .unwrap_or_default();
                println!(
                    "  {:<20} {}{}",
                    name,
                    color_status(&component.status),
                    detail.dimmed()
                );
            }
        }
    }

    Ok(())
}
