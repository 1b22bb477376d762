use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use docsift_core::{AppState, Config, Dispatcher, ProcessOutcome, Settings};

use crate::commands::ProcessResponse;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP extraction trigger (default)
    Serve,
    /// Extract text from a local file and print the result as JSON
    Extract {
        /// File to extract
        file: PathBuf,
        /// Declared file type (short name, extension or MIME type)
        #[arg(long = "type")]
        file_type: Option<String>,
    },
    /// Run ingestion for one document in the local stores
    Process {
        /// Document identifier
        document_id: String,
    },
}

/// Run a command on a fresh Tokio runtime.
pub fn run(command: Command) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let config = Config::load_or_default();

    match command {
        Command::Serve => rt.block_on(crate::run_server(config)),
        Command::Extract { file, file_type } => extract_file(&config, &file, file_type.as_deref()),
        Command::Process { document_id } => rt.block_on(process_document(config, &document_id)),
    }
}

fn extract_file(config: &Config, file: &Path, file_type: Option<&str>) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let settings = Settings::load(&config.settings_file);
    let dispatcher = Dispatcher::new(&settings)?;

    let path = file.to_string_lossy();
    let result = dispatcher.extract(&bytes, file_type.unwrap_or(""), &path);
    tracing::info!(
        page_count = result.page_count,
        method = %result.method,
        is_scanned = result.is_scanned,
        "Extracted {:?}",
        file
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn process_document(config: Config, document_id: &str) -> anyhow::Result<()> {
    config.ensure_dirs()?;
    let state = AppState::new(config)?;

    let outcome: ProcessOutcome = state.ingestor.process(document_id).await?;
    let response = ProcessResponse::from(outcome);

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
