//! Folio CLI: bulk attachment ingestion for operators.
//!
//! Settings come from the environment (or `.env`): BULK_UPLOAD_TEMP_ROOT,
//! UNZIP_PATH, ZIPINFO_PATH, ARCHIVE_TOOL_TIMEOUT_SECS,
//! ATTACHMENT_ALLOWED_EXTENSIONS and DATABASE_URL.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_core::{AttachmentParams, AttachmentStore, IngestConfig};
use folio_db::{PgAttachmentStore, PgPool};
use folio_cli::{init_tracing, parse_title_assignment};
use folio_ingest::{BulkUploadService, UploadedFile};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "folio", about = "Bulk attachment ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files a zip archive would contribute
    Inspect {
        /// Path to the zip archive
        zip: PathBuf,
    },
    /// Add or replace an edition's attachments from a zip or loose files
    Ingest {
        /// Edition UUID
        #[arg(long)]
        edition: Uuid,
        /// Title for an uploaded file, as FILENAME=TITLE (repeatable)
        #[arg(long = "title", value_parser = parse_title_assignment)]
        titles: Vec<(String, String)>,
        /// Loose file to upload instead of an archive (repeatable)
        #[arg(long = "file", conflicts_with = "zip")]
        files: Vec<PathBuf>,
        /// Path to the zip archive
        zip: Option<PathBuf>,
    },
    /// Apply database migrations
    Migrate,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn connect(config: &IngestConfig) -> anyhow::Result<PgPool> {
    let url = config
        .database_url()
        .context("DATABASE_URL must be set for this command")?;
    let pool = folio_db::connect(url)
        .await
        .context("Failed to connect to database")?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = IngestConfig::from_env().context("Invalid configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { zip } => {
            let service = BulkUploadService::new(&config);
            let files = service.inspect(&UploadedFile::from_path(zip)).await?;
            print_json(&serde_json::json!({ "files": files }))?;
        }
        Commands::Ingest {
            edition,
            titles,
            files,
            zip,
        } => {
            let pool = connect(&config).await?;
            let store = PgAttachmentStore::new(pool);
            let mut edition = store
                .load_edition(edition)
                .await?
                .with_context(|| format!("Edition {} not found", edition))?;

            let service = BulkUploadService::new(&config);
            let mut ingestion = match zip {
                Some(zip) => {
                    service
                        .prepare_zip(&edition, Some(&UploadedFile::from_path(zip)))
                        .await?
                }
                None if !files.is_empty() => service.prepare_files(&edition, &files).await?,
                None => anyhow::bail!("Provide a zip archive or at least one --file"),
            };

            for (filename, title) in &titles {
                match ingestion.attachment_with_filename_mut(filename) {
                    Some(attachment) => attachment.apply(&AttachmentParams::titled(title.as_str())),
                    None => tracing::warn!(filename = %filename, "No uploaded file with this name"),
                }
            }

            let result = ingestion.save_to_edition(&store, &mut edition).await?;
            print_json(&result)?;
            if !result.is_committed() {
                anyhow::bail!("Bulk upload rejected; nothing was saved");
            }
        }
        Commands::Migrate => {
            let pool = connect(&config).await?;
            folio_db::run_migrations(&pool).await?;
            print_json(&serde_json::json!({ "success": true }))?;
        }
    }

    Ok(())
}
