use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use optivault_backup::{BackupAssembler, default_file_name};

use crate::{OutputFormat, Session};

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Where to write the backup. Defaults to a timestamped name in the
    /// current directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub async fn run(session: &Session, args: &BackupArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let principal = session.principal()?;
    let store = Arc::new(super::load_store(&session.store_path).await?);

    let output = BackupAssembler::new(store, session.backup.clone())
        .assemble(&principal)
        .await?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_file_name(&principal.email, Utc::now())));
    let bytes = output.artifact.to_json_bytes()?;
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write backup {}", path.display()))?;

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "file": path,
                "report": output.report,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!(
                "Backed up {} documents to {}",
                output.report.total_documents,
                path.display()
            );
            for stats in &output.report.collections {
                let skipped = if stats.placeholders_skipped > 0 {
                    format!(" ({} placeholders skipped)", stats.placeholders_skipped)
                } else {
                    String::new()
                };
                println!("  {:<20} {:>6}{skipped}", stats.collection.as_str(), stats.documents);
            }
            for warning in &output.report.warnings {
                println!("warning: {warning}");
            }
        }
    }
    Ok(())
}
