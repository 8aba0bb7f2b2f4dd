use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use halal_sync::{
    CertPortalClient, DispatchOutcome, FileSystemStore, FinalDispatcher, FormApiClient,
    FormSyncReconciler, LogNotifier, SectionFilter, SectionKind, SubmissionFiles,
    SubmissionOrchestrator, SubmitOptions, SyncLock,
};

#[derive(Parser)]
#[command(name = "halal-sync")]
#[command(about = "FormAPI to CertPortal halal-certification submission pipeline")]
#[command(long_about = "halal-sync mirrors form submissions into local storage and pushes them \
                       to the certification portal section by section, with per-section status \
                       tracking and idempotent retry. Invoked by the host scheduler as a \
                       background task.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile local records against the form provider
    Sync,
    /// Push records to the certification portal section by section
    Submit {
        /// Record id to process (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
        /// Owning user to notify if the portal token has expired
        #[arg(long)]
        user: Option<String>,
        /// Restrict the run to a single section, e.g. bahan or proses
        #[arg(long)]
        section: Option<String>,
    },
    /// Final-submit registrations whose sections are all done
    Dispatch {
        /// Record id to dispatch (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    halal_sync::init_telemetry()?;
    halal_sync::init_config()?;

    match cli.command {
        Commands::Sync => {
            tokio::runtime::Runtime::new()?.block_on(async { sync_command().await })
        }
        Commands::Submit { ids, user, section } => tokio::runtime::Runtime::new()?
            .block_on(async { submit_command(ids, user, section).await }),
        Commands::Dispatch { ids } => {
            tokio::runtime::Runtime::new()?.block_on(async { dispatch_command(ids).await })
        }
    }
}

async fn sync_command() -> Result<()> {
    let config = halal_sync::config()?;
    let api_key = config
        .formapi
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("form provider API key is not configured"))?;

    let form_api = FormApiClient::new(&config.formapi.base_url, api_key, &config.formapi.form_id)?;

    // Preflight: a bad key or form id should fail loudly here, not midway
    // through reconciliation.
    let form = form_api.fetch_form().await?;
    tracing::info!(form_id = %form.id, title = %form.title, "form provider reachable");

    let store = Arc::new(FileSystemStore::new(&config.storage.data_dir));
    let files = SubmissionFiles::new(&config.storage.files_dir);
    let lock = SyncLock::new(&config.sync.lock_path, config.sync.lock_ttl_minutes);

    let reconciler = FormSyncReconciler::new(form_api, store, files, lock);
    let report = reconciler.run().await?;
    println!(
        "Sync complete: {} created, {} updated, {} deleted",
        report.created, report.updated, report.deleted
    );
    Ok(())
}

async fn submit_command(
    ids: Vec<String>,
    user: Option<String>,
    section: Option<String>,
) -> Result<()> {
    let filter = match section {
        None => SectionFilter::All,
        Some(name) => SectionKind::from_str_name(&name)
            .map(SectionFilter::Only)
            .ok_or_else(|| anyhow!("unknown section '{name}'"))?,
    };

    let config = halal_sync::config()?;
    let store = Arc::new(FileSystemStore::new(&config.storage.data_dir));
    let files = SubmissionFiles::new(&config.storage.files_dir);
    let portal = Arc::new(CertPortalClient::new(
        &config.certportal.base_url,
        config.certportal.token.as_deref(),
    )?);
    if !portal.has_live_token(chrono::Utc::now()) {
        tracing::warn!("portal token is missing or past its exp claim; calls may be rejected");
    }

    let orchestrator =
        SubmissionOrchestrator::new(store, portal, files, Arc::new(LogNotifier));
    let report = orchestrator
        .run(SubmitOptions {
            record_ids: ids,
            user_id: user,
            filter,
        })
        .await;

    println!(
        "Submit batch finished: {} processed, {} errored",
        report.processed, report.errored
    );
    if report.halted_for_token {
        return Err(anyhow!(
            "portal token expired or unauthorized; batch halted"
        ));
    }
    Ok(())
}

async fn dispatch_command(ids: Vec<String>) -> Result<()> {
    let config = halal_sync::config()?;
    let store = Arc::new(FileSystemStore::new(&config.storage.data_dir));
    let portal = Arc::new(CertPortalClient::new(
        &config.certportal.base_url,
        config.certportal.token.as_deref(),
    )?);
    let dispatcher = FinalDispatcher::new(store, portal);

    for id in ids {
        match dispatcher.dispatch(&id).await? {
            DispatchOutcome::Submitted => println!("{id}: submitted"),
            DispatchOutcome::Blocked { incomplete } => println!(
                "{id}: blocked, incomplete sections: {}",
                incomplete.join(", ")
            ),
            DispatchOutcome::Rejected { status, message } => {
                println!("{id}: rejected by portal ({status}): {message}")
            }
        }
    }
    Ok(())
}
