//! CLI mode
//!
//! One-shot maintenance commands against the configured database.

use anyhow::{Context, Result};

use crate::cli::Commands;
use crate::config::{StaticConfig, get_config};
use crate::runtime::lifetime;
use crate::storage::ContentType;

/// Run a non-server command
pub async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve => super::run_server().await,
        Commands::GenerateConfig { output_path } => generate_config(output_path.as_deref()),
        Commands::CleanStats { days } => {
            let days = days.unwrap_or(get_config().statistics.retention_days);
            let context = lifetime::startup::prepare_startup().await?;
            let deleted = context.statistics.clean_old_stats(days).await?;
            println!("Deleted {} statistics rows older than {} days", deleted, days);
            Ok(())
        }
        Commands::Reconcile { content_type } => {
            let context = lifetime::startup::prepare_startup().await?;
            let reports = match content_type {
                Some(name) => {
                    let content_type = ContentType::parse(&name)?;
                    vec![context.engagement.reconcile(content_type).await?]
                }
                None => context.engagement.reconcile_all().await,
            };
            for report in reports {
                let name = report
                    .content_type
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                println!(
                    "{:<8} scanned {:>6}  likes fixed {:>4}  shares fixed {:>4}",
                    name, report.rows_scanned, report.likes_fixed, report.shares_fixed
                );
            }
            Ok(())
        }
    }
}

fn generate_config(output_path: Option<&str>) -> Result<()> {
    let sample = StaticConfig::generate_sample_config();
    match output_path {
        Some(path) => {
            std::fs::write(path, sample)
                .with_context(|| format!("Failed to write config to {}", path))?;
            println!("Configuration written to {}", path);
        }
        None => print!("{}", sample),
    }
    Ok(())
}
