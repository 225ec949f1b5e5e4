use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Args;
use optivault_backup::{
    Artifact, RestoreControl, RestoreOrchestrator, RestoreProgress, RestoreSummary, validate_ownership,
};
use optivault_store_memory::MemoryTenantLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{OutputFormat, Session};

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup file to restore.
    pub file: PathBuf,

    /// Parse the file and run the ownership check without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(
    session: &Session,
    args: &RestoreArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let principal = session.principal()?;
    let bytes = super::read_file(&args.file).await?;

    if args.dry_run {
        let artifact = Artifact::parse(&bytes)?;
        let check = validate_ownership(&artifact.metadata, &principal);
        match format {
            OutputFormat::Json => {
                let body = serde_json::json!({
                    "ownership": check,
                    "preview": artifact.preview(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            OutputFormat::Text => {
                println!(
                    "{} documents in {} collections",
                    artifact.document_count(),
                    artifact.metadata.collections.len()
                );
                for warning in &check.warnings {
                    println!("warning: {warning}");
                }
                for error in &check.errors {
                    println!("error: {error}");
                }
            }
        }
        if !check.valid {
            bail!("backup cannot be restored by {principal}");
        }
        return Ok(());
    }

    let _dataset = super::DatasetLock::acquire(&session.store_path, session.backup.lock_timeout)
        .await?;
    let store = Arc::new(super::load_store(&session.store_path).await?);
    let orchestrator = RestoreOrchestrator::new(store.clone(), session.backup.clone())
        .with_lock(Arc::new(MemoryTenantLock::new()));

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight writes");
                cancel.cancel();
            }
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<RestoreProgress>();
    let show_progress = matches!(format, OutputFormat::Text);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if show_progress {
                eprintln!(
                    "[{}/{}] {}: {} restored, {} skipped, {} errored",
                    event.collections_done,
                    event.collections_total,
                    event.collection,
                    event.restored,
                    event.skipped,
                    event.errored
                );
            }
        }
    });

    let control = RestoreControl::new().with_cancel(cancel).with_progress(tx);
    let result = orchestrator.restore(&bytes, &principal, &control).await;
    drop(control);
    join_reporter(printer).await;
    interrupt.abort();

    let summary = result?;
    super::save_store(&store, &session.store_path).await?;
    print_summary(&summary, format)?;

    if summary.lock_lost {
        bail!(
            "restore lock lost; {} documents not written",
            summary.not_attempted
        );
    }
    if summary.cancelled {
        bail!("restore cancelled; {} documents not written", summary.not_attempted);
    }
    Ok(())
}

/// Wait for the progress printer. Its failure never fails the restore.
async fn join_reporter(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "progress reporter failed");
            false
        }
    }
}

fn print_summary(summary: &RestoreSummary, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            println!(
                "Restored {}, skipped {}, errored {}, not attempted {}",
                summary.restored, summary.skipped, summary.errored, summary.not_attempted
            );
            for outcome in &summary.collections {
                for failure in &outcome.failures {
                    println!("  {}/{}: {}", outcome.collection, failure.id, failure.error);
                }
            }
            for warning in &summary.warnings {
                println!("warning: {warning}");
            }
        }
    }
    Ok(())
}
