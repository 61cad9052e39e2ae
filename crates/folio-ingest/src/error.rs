use std::io;
use std::path::PathBuf;
use std::time::Duration;

use folio_core::{AppError, ErrorMetadata, LogLevel};

/// Errors raised while staging, checking or committing a bulk upload.
///
/// Per-attachment validation problems are not errors: they are folded into a
/// rejected [`IngestionResult`](crate::IngestionResult).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Staging failed: {context}")]
    Staging {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} did not finish within {}s", timeout.as_secs())]
    ToolTimeout {
        tool: &'static str,
        timeout: Duration,
    },

    #[error("No zip file was uploaded")]
    MissingArchive,

    #[error("not a zip file")]
    NotAZipFile,

    #[error("contains invalid files: {}", files.join(", "))]
    DisallowedFileType { files: Vec<String> },

    #[error("Could not read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Attachments were not validated against this edition: {0}")]
    NotValidated(String),

    #[error(transparent)]
    Persistence(#[from] AppError),
}

impl IngestError {
    pub(crate) fn staging(context: impl Into<String>, source: io::Error) -> Self {
        IngestError::Staging {
            context: context.into(),
            source,
        }
    }

    /// Copy, filesystem and tool-hang failures while preparing the archive.
    pub fn is_staging_error(&self) -> bool {
        matches!(
            self,
            IngestError::Staging { .. } | IngestError::ToolTimeout { .. }
        )
    }
}

fn ingest_error_static_metadata(
    err: &IngestError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        IngestError::Staging { .. } => (
            500,
            "STAGING_ERROR",
            true,
            Some("Retry the upload after a short delay"),
            true,
            LogLevel::Error,
        ),
        IngestError::ToolTimeout { .. } => (
            500,
            "STAGING_ERROR",
            true,
            Some("Check the archive is not corrupt and retry"),
            false,
            LogLevel::Warn,
        ),
        IngestError::MissingArchive => (
            422,
            "ZIP_FILE_MISSING",
            false,
            Some("Choose a zip file to upload"),
            false,
            LogLevel::Debug,
        ),
        IngestError::NotAZipFile => (
            422,
            "NOT_A_ZIP_FILE",
            false,
            Some("Upload a valid zip archive"),
            false,
            LogLevel::Debug,
        ),
        IngestError::DisallowedFileType { .. } => (
            422,
            "DISALLOWED_FILE_TYPE",
            false,
            Some("Remove unsupported file types from the archive"),
            false,
            LogLevel::Debug,
        ),
        IngestError::UnreadableFile { .. } => (
            500,
            "STAGING_ERROR",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        IngestError::NotValidated(_) => (
            500,
            "NOT_VALIDATED",
            false,
            None,
            true,
            LogLevel::Error,
        ),
        IngestError::Persistence(inner) => (
            inner.http_status_code(),
            inner.error_code(),
            inner.is_recoverable(),
            inner.suggested_action(),
            inner.is_sensitive(),
            inner.log_level(),
        ),
    }
}

impl ErrorMetadata for IngestError {
    fn http_status_code(&self) -> u16 {
        ingest_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        ingest_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        ingest_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        ingest_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        ingest_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::Staging { .. } | IngestError::UnreadableFile { .. } => {
                "The upload could not be processed".to_string()
            }
            IngestError::NotValidated(_) => "Internal server error".to_string(),
            IngestError::Persistence(inner) => inner.client_message(),
            other => other.to_string(),
        }
    }
}
