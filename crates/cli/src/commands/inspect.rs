use std::path::PathBuf;

use clap::Args;
use optivault_backup::inspect;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Backup file to examine.
    pub file: PathBuf,
}

pub async fn run(args: &InspectArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let bytes = super::read_file(&args.file).await?;
    let preview = inspect(&bytes)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        OutputFormat::Text => {
            println!("Owner:          {}", preview.owner_id);
            if !preview.owner_email.is_empty() {
                println!("Owner email:    {}", preview.owner_email);
            }
            if let Some(created) = preview.created_at {
                println!("Created:        {}", created.to_rfc3339());
            }
            println!("Format version: {}", preview.version);
            println!(
                "Documents:      {} ({} declared)",
                preview.counted_documents, preview.declared_documents
            );
            for c in &preview.collections {
                println!("  {:<20} {:>6}", c.name.as_str(), c.documents);
            }
        }
    }
    Ok(())
}
