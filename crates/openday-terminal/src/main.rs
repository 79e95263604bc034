//! Entry point for the headless registration terminal.
//!
//! Staff-facing UIs talk to the same pipeline through their own bindings;
//! this binary covers the rest: scripted submissions, queue inspection,
//! manual sync, and a long-running mode that keeps the probe loop alive.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use openday_client::HttpBackend;
use openday_core::RegistrationRecord;
use openday_outbox::{FileOutbox, OutboxStore};
use openday_sync::{OfflinePipeline, SubmitOutcome};

use crate::config::TerminalConfig;

#[derive(Parser)]
#[command(
    name = "openday-terminal",
    about = "Open-day registration terminal with an offline-resilient queue",
    version
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registration API base URL (overrides the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Directory for the durable queue (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Bearer token for the API (overrides the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a registration record from a JSON file
    Submit {
        /// Path to the record; `-` reads standard input
        file: PathBuf,
    },
    /// Show connectivity and queue depth
    Status,
    /// Replay queued records now
    Sync,
    /// List queued records
    Pending,
    /// Drop every queued record
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Keep the terminal running: probe connectivity, drain on recovery
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("openday=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TerminalConfig::load(cli.config.as_deref())?.merged_with(
        cli.backend_url,
        cli.data_dir,
        cli.token,
    );

    for warning in config.sync_config().validate() {
        warn!(%warning, "Questionable configuration");
    }

    let backend = Arc::new(HttpBackend::new(config.http_backend()));
    let outbox: Arc<FileOutbox<RegistrationRecord>> = Arc::new(
        FileOutbox::new(&config.data_dir)
            .await
            .context("opening the durable queue")?,
    );
    let pipeline = OfflinePipeline::new(backend, outbox.clone(), config.sync_config());

    match cli.command {
        Command::Submit { file } => submit(&pipeline, &file).await,
        Command::Status => status(&pipeline).await,
        Command::Sync => sync(&pipeline).await,
        Command::Pending => pending(&outbox).await,
        Command::Clear { yes } => clear(&outbox, yes).await,
        Command::Run => run(&pipeline).await,
    }
}

async fn submit(pipeline: &OfflinePipeline<RegistrationRecord>, file: &PathBuf) -> Result<()> {
    let raw = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading record from stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("reading record from {}", file.display()))?
    };

    let record: RegistrationRecord = serde_json::from_str(&raw).context("parsing record JSON")?;
    record
        .validate()
        .context("record failed local validation")?;

    match pipeline.submit(record).await? {
        SubmitOutcome::Accepted(ack) => match ack.record_id() {
            Some(id) => println!("accepted, server id {id}"),
            None => println!("accepted"),
        },
        SubmitOutcome::Queued { id } => {
            let waiting = pipeline.pending_count().await?;
            println!("backend unreachable, queued as {id} ({waiting} waiting)");
        }
    }
    Ok(())
}

async fn status(pipeline: &OfflinePipeline<RegistrationRecord>) -> Result<()> {
    // A fresh probe, so the answer reflects right now rather than the
    // assumed startup state
    pipeline.monitor().probe_once().await;

    let state = if pipeline.is_online() { "online" } else { "offline" };
    let waiting = pipeline.pending_count().await?;
    println!("connectivity: {state}");
    println!("queued records: {waiting}");
    Ok(())
}

async fn sync(pipeline: &OfflinePipeline<RegistrationRecord>) -> Result<()> {
    pipeline.monitor().probe_once().await;

    if !pipeline.is_online() {
        let waiting = pipeline.pending_count().await?;
        println!("offline, {waiting} records still waiting");
        return Ok(());
    }

    let report = pipeline.trigger_sync().await;
    println!("synced {} records, {} failed", report.success, report.failed);
    Ok(())
}

async fn pending(outbox: &Arc<FileOutbox<RegistrationRecord>>) -> Result<()> {
    let records = outbox.list_pending().await?;
    if records.is_empty() {
        println!("queue is empty");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {} {}",
            record.id,
            record.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
            record.payload.first_name,
            record.payload.last_name,
        );
    }
    Ok(())
}

async fn clear(outbox: &Arc<FileOutbox<RegistrationRecord>>, yes: bool) -> Result<()> {
    let waiting = outbox.count().await?;
    if !yes {
        bail!("refusing to drop {waiting} queued records without --yes");
    }

    outbox.clear().await?;
    println!("dropped {waiting} records");
    Ok(())
}

async fn run(pipeline: &OfflinePipeline<RegistrationRecord>) -> Result<()> {
    let connectivity_token = pipeline.subscribe_connectivity(|online| {
        if online {
            println!("connectivity: online");
        } else {
            println!("connectivity: offline, new records will be queued");
        }
    });
    let data_token = pipeline.subscribe_data_changed(|report| {
        println!("replayed {} queued records", report.success);
    });

    pipeline.start().await?;
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    pipeline.stop().await;
    pipeline.unsubscribe_connectivity(connectivity_token);
    pipeline.unsubscribe_data_changed(data_token);
    Ok(())
}
