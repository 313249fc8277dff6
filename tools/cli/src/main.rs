//! DocDrive CLI - Command line access to the accounting document drive.
//!
//! Runs the HTTP server, performs the one-time Google consent from a
//! terminal, and exposes the read-only Drive operations directly.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docdrive_common::{classify_document, DocumentMetadata, DocumentType, FileInfo};
use docdrive_server::Settings;
use serde_json::json;
use docdrive_storage::{
    AuthorizationResponse, ConsentHandler, CredentialManager, CredentialSource, DriveClient,
    DriveClientConfig,
};

#[derive(Parser)]
#[command(name = "docdrive")]
#[command(about = "DocDrive - Google Drive access for accounting documents")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on (overrides DOCDRIVE_BIND).
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Authorize Google Drive access and store the token.
    Login,

    /// List files in Drive's default order.
    List {
        /// Only list direct children of this folder.
        #[arg(short, long)]
        folder: Option<String>,

        /// Maximum number of files (1-1000).
        #[arg(short = 'n', long, default_value_t = 10)]
        page_size: u32,
    },

    /// Search files with a Drive query expression.
    Search {
        /// Query, e.g. "name contains 'invoice'".
        query: String,

        /// Maximum number of files (1-1000).
        #[arg(short = 'n', long, default_value_t = 10)]
        page_size: u32,
    },

    /// Show classified metadata for one file.
    Metadata {
        /// Drive file ID.
        file_id: String,
    },

    /// List documents of one type.
    ByType {
        /// invoice, receipt, contract, tax_return, or other.
        doc_type: DocumentType,

        /// Maximum number of files scanned (1-1000).
        #[arg(short = 'n', long, default_value_t = 10)]
        page_size: u32,
    },

    /// Classify file names without contacting Drive.
    Classify {
        /// File names to classify.
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let json = cli.json;
    match cli.command {
        Commands::Serve { bind } => cmd_serve(bind).await,

        Commands::Login => cmd_login().await,

        Commands::List { folder, page_size } => {
            let drive = connect().await?;
            let files = drive
                .list_files(folder.as_deref(), page_size)
                .await
                .context("Failed to list files")?;
            println!("{}", render_files(&files, json)?);
            Ok(())
        }

        Commands::Search { query, page_size } => {
            let drive = connect().await?;
            let files = drive
                .search_files(&query, page_size)
                .await
                .context("Failed to search files")?;
            println!("{}", render_files(&files, json)?);
            Ok(())
        }

        Commands::Metadata { file_id } => {
            let drive = connect().await?;
            let metadata = drive
                .get_document_metadata(&file_id)
                .await
                .context("Failed to fetch metadata")?;
            println!("{}", render_document(&metadata, json)?);
            Ok(())
        }

        Commands::ByType {
            doc_type,
            page_size,
        } => {
            let drive = connect().await?;
            let documents = drive
                .list_documents_by_type(doc_type, page_size)
                .await
                .context("Failed to list documents")?;
            println!("{}", render_documents(&documents, json)?);
            Ok(())
        }

        Commands::Classify { names } => {
            println!("{}", render_classifications(&names, json)?);
            Ok(())
        }
    }
}

/// Prompts on the terminal for the authorization code.
struct ConsoleConsent;

#[async_trait]
impl ConsentHandler for ConsoleConsent {
    async fn obtain_code(
        &self,
        authorization_url: &str,
    ) -> docdrive_common::Result<AuthorizationResponse> {
        println!("Open this URL to authorize Google Drive access:\n\n  {}\n", authorization_url);
        if let Err(e) = open::that(authorization_url) {
            warn!("Could not open a browser: {}", e);
        }

        println!("Paste the authorization code or the full redirect URL:");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;

        AuthorizationResponse::parse(&line)
    }
}

/// Build a Drive client from the environment, prompting for consent if needed.
async fn connect() -> Result<DriveClient> {
    let settings = Settings::from_env()?;
    let source = CredentialSource::resolve(&settings.credentials)
        .context("No usable Google credentials")?;
    let credentials = CredentialManager::new(source, Arc::new(ConsoleConsent))?;

    let drive = DriveClient::new(
        Arc::new(credentials),
        DriveClientConfig {
            api_base: settings.drive_api_base,
            timeout: settings.request_timeout,
        },
    )?;
    Ok(drive)
}

/// Run the HTTP API.
async fn cmd_serve(bind: Option<SocketAddr>) -> Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(bind) = bind {
        settings.bind = bind;
    }

    info!("Starting DocDrive API");
    docdrive_server::serve(settings).await
}

/// Authorize and persist the token.
async fn cmd_login() -> Result<()> {
    let drive = connect().await?;
    let credentials = drive.credentials();

    credentials
        .authenticate()
        .await
        .context("Authorization failed")?;

    if credentials.is_interactive() {
        println!("Google Drive access authorized.");
    } else {
        println!("Service account credentials are valid; no consent needed.");
    }
    Ok(())
}

fn render_files(files: &[FileInfo], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(files)?);
    }

    if files.is_empty() {
        return Ok("No files found.".to_string());
    }

    let lines: Vec<String> = files
        .iter()
        .map(|file| {
            if file.is_folder() {
                format!("  [DIR]  {}/  {}", file.name, file.id)
            } else {
                let size_str = file.size.map(|s| format!(" ({} bytes)", s)).unwrap_or_default();
                format!("  [FILE] {}{}  {}", file.name, size_str, file.id)
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

fn document_line(doc: &DocumentMetadata) -> String {
    format!(
        "  {:<10} {}  {}  (modified {})",
        doc.doc_type,
        doc.name,
        doc.id,
        doc.updated_at.format("%Y-%m-%d")
    )
}

/// Single document, shaped like the metadata route.
fn render_document(doc: &DocumentMetadata, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(doc)?);
    }
    Ok(document_line(doc))
}

fn render_documents(documents: &[DocumentMetadata], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(documents)?);
    }

    if documents.is_empty() {
        return Ok("No documents found.".to_string());
    }

    let lines: Vec<String> = documents.iter().map(document_line).collect();
    Ok(lines.join("\n"))
}

fn render_classifications(names: &[String], json: bool) -> Result<String> {
    if json {
        let entries: Vec<_> = names
            .iter()
            .map(|name| json!({ "name": name, "type": classify_document(name) }))
            .collect();
        return Ok(serde_json::to_string_pretty(&entries)?);
    }

    let lines: Vec<String> = names
        .iter()
        .map(|name| format!("{:<10} {}", classify_document(name), name))
        .collect();
    Ok(lines.join("\n"))
}
