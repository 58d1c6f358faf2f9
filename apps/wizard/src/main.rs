use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use ingest_core::IngestEngine;
use panel::{IntentOutcome, PanelController, PanelError, PanelView, WizardProgress, WizardStage};
use shared::{
    domain::{FileMetadata, FileState, SortDirection, SortKey},
    error::ErrorReport,
    protocol::{IngestEvent, PanelIntent},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

/// Runs a scripted knowledge-base upload session and prints the file table.
#[derive(Parser, Debug)]
#[command(name = "wizard")]
struct Cli {
    /// File to upload, as `name:size_bytes:media_type`. Repeatable.
    #[arg(long = "file", value_name = "NAME:SIZE:TYPE")]
    files: Vec<FileArg>,
    /// Convert every transferred file once uploads settle.
    #[arg(long)]
    convert: bool,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    page: Option<usize>,
    /// Print the final view as JSON instead of a table.
    #[arg(long)]
    json: bool,
    /// Settings file; defaults to `wizard.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct FileArg(FileMetadata);

impl FromStr for FileArg {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.rsplitn(3, ':');
        let (Some(media_type), Some(size), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected NAME:SIZE:TYPE, got '{raw}'"));
        };
        if name.is_empty() {
            return Err(format!("file name is empty in '{raw}'"));
        }
        let size_bytes = size
            .parse::<u64>()
            .map_err(|error| format!("invalid size '{size}': {error}"))?;
        Ok(Self(FileMetadata::new(name, size_bytes, media_type)))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Size,
    Type,
    Created,
    Status,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortKey::Name,
            SortArg::Size => SortKey::Size,
            SortArg::Type => SortKey::MediaType,
            SortArg::Created => SortKey::CreatedAt,
            SortArg::Status => SortKey::State,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.convert && cli.files.is_empty() {
        bail!("--convert needs at least one --file");
    }
    let settings = load_settings(cli.config.as_deref())?;

    let mut wizard = WizardProgress::default();
    wizard.complete(WizardStage::Configuration);

    let engine = Arc::new(IngestEngine::new(settings).context("failed to start ingestion engine")?);
    let event_log = tokio::spawn(log_events(engine.subscribe_events()));
    let mut panel = PanelController::new(Arc::clone(&engine));
    let mut rejected = Vec::new();

    let files: Vec<FileMetadata> = cli.files.into_iter().map(|file| file.0).collect();
    if !files.is_empty() {
        record(
            &mut rejected,
            panel.dispatch(PanelIntent::AddFiles { files }).await,
        );
        engine.wait_for_idle().await;
    }

    if cli.convert {
        for file in engine.files().await {
            if file.state == FileState::Transferred {
                record(
                    &mut rejected,
                    panel
                        .dispatch(PanelIntent::RequestConversion { file_id: file.id })
                        .await,
                );
            }
        }
        engine.wait_for_idle().await;
    }

    if let Some(term) = cli.search {
        panel.dispatch(PanelIntent::SetSearch { term }).await;
    }
    if cli.sort.is_some() || cli.desc {
        let key = cli.sort.map(SortKey::from).unwrap_or(panel.controls().sort_key);
        let direction = if cli.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        panel.dispatch(PanelIntent::SetSort { key, direction }).await;
    }
    if let Some(page) = cli.page {
        panel.dispatch(PanelIntent::SetPage { page }).await;
    }

    let view = panel.view().await;
    let exit = panel.close().await;
    match &exit {
        Ok(exit) if exit.knowledgebase_complete => {
            wizard.complete(WizardStage::Knowledgebase);
        }
        Ok(_) => info!("knowledge panel closed without a ready file"),
        Err(error) => warn!(%error, "knowledge panel cannot be closed yet"),
    }

    if cli.json {
        let output = serde_json::json!({
            "view": view,
            "rejected": rejected,
            "close_blocked": exit.is_err(),
            "setup_percent": wizard.percent(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to encode view")?
        );
    } else {
        print_table(&view);
        for report in &rejected {
            println!("rejected: {}", report.message);
        }
        println!("setup {}% complete", wizard.percent());
    }

    engine.shutdown().await;
    event_log.abort();
    Ok(())
}

fn record(rejected: &mut Vec<ErrorReport>, outcome: IntentOutcome) {
    match outcome {
        IntentOutcome::Applied => {}
        IntentOutcome::Ignored(PanelError::Ingest(error)) => rejected.push(ErrorReport::from(&error)),
        IntentOutcome::Ignored(error) => warn!(%error, "intent ignored"),
    }
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<IngestEvent>) {
    loop {
        match events.recv().await {
            Ok(IngestEvent::FileAdded { file }) => {
                info!(file_id = %file.id, name = %file.name, size_bytes = file.size_bytes, "file added")
            }
            Ok(IngestEvent::ProgressChanged { file_id, progress }) => {
                debug!(%file_id, progress, "progress")
            }
            Ok(IngestEvent::StateChanged { file_id, state }) => {
                info!(%file_id, %state, "state changed")
            }
            Ok(IngestEvent::FileRemoved { file_id }) => info!(%file_id, "file removed"),
            Ok(IngestEvent::GateChanged { complete }) => info!(complete, "knowledge gate changed"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_table(view: &PanelView) {
    println!(
        "{:<28} {:>10} {:<12} {:<20} {:<14}",
        "NAME", "SIZE", "TYPE", "UPLOADED", "STATUS"
    );
    for row in &view.rows {
        println!(
            "{:<28} {:>10} {:<12} {:<20} {:<14}",
            row.name, row.size, row.media_type, row.created_at, row.tooltip
        );
    }
    for _ in 0..view.placeholder_rows {
        println!("{:<28} {:>10} {:<12} {:<20} {:<14}", "-", "", "", "", "");
    }
    println!(
        "page {} of {} ({} matching)",
        view.page,
        view.total_pages.max(1),
        view.filtered_count
    );
    println!("{}", view.footer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_arguments() {
        let FileArg(file) = "notes.md:2048:text/markdown".parse().expect("parse");
        assert_eq!(file.name, "notes.md");
        assert_eq!(file.size_bytes, 2048);
        assert_eq!(file.media_type, "text/markdown");

        let FileArg(file) = "a:b.txt:5:text/plain".parse().expect("colon in name");
        assert_eq!(file.name, "a:b.txt");

        assert!("notes.md:2048".parse::<FileArg>().is_err());
        assert!("notes.md:big:text/plain".parse::<FileArg>().is_err());
        assert!(":1:text/plain".parse::<FileArg>().is_err());
    }

    #[test]
    fn cli_accepts_repeated_files() {
        let cli = Cli::try_parse_from([
            "wizard", "--file", "a.pdf:10:application/pdf", "--file", "b.txt:5:text/plain",
            "--sort", "size", "--desc", "--page", "2",
        ])
        .expect("parse cli");
        assert_eq!(cli.files.len(), 2);
        assert!(matches!(cli.sort, Some(SortArg::Size)));
        assert!(cli.desc);
        assert_eq!(cli.page, Some(2));
    }
}
