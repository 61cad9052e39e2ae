//! Configuration module
//!
//! Settings for the bulk attachment ingestion pipeline: where uploads are
//! staged, which external archive tools to run, how long they may take, and
//! which attachment file extensions are accepted.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const UNZIP_PATH: &str = "unzip";
const ZIPINFO_PATH: &str = "zipinfo";
const ARCHIVE_TOOL_TIMEOUT_SECS: u64 = 30;

/// Extensions accepted for attachments when `ATTACHMENT_ALLOWED_EXTENSIONS`
/// is not set.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "chm", "csv", "diff", "doc", "docx", "dot", "dxf", "eps", "gif", "gml", "ics", "jpg", "kml",
    "odp", "ods", "odt", "pdf", "png", "ppt", "pptx", "ps", "rdf", "rtf", "sch", "txt", "wsdl",
    "xls", "xlsm", "xlsx", "xlt", "xml", "xsd", "xslt", "zip",
];

/// Bulk upload / ingestion configuration.
///
/// Passed explicitly to the stager and the content policy at construction.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Directory under which per-upload scratch directories are created
    pub temp_root: PathBuf,
    /// Archive extraction tool
    pub unzip_path: PathBuf,
    /// Archive listing tool
    pub zipinfo_path: PathBuf,
    pub tool_timeout: Duration,
    /// Lowercase extensions without a leading dot
    pub allowed_extensions: Vec<String>,
    pub database_url: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            temp_root: env::temp_dir(),
            unzip_path: PathBuf::from(UNZIP_PATH),
            zipinfo_path: PathBuf::from(ZIPINFO_PATH),
            tool_timeout: Duration::from_secs(ARCHIVE_TOOL_TIMEOUT_SECS),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            database_url: None,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tool_timeout_secs = match lookup("ARCHIVE_TOOL_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("ARCHIVE_TOOL_TIMEOUT_SECS must be a whole number of seconds")
            })?,
            None => ARCHIVE_TOOL_TIMEOUT_SECS,
        };

        let config = IngestConfig {
            temp_root: lookup("BULK_UPLOAD_TEMP_ROOT")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_root),
            unzip_path: lookup("UNZIP_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.unzip_path),
            zipinfo_path: lookup("ZIPINFO_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.zipinfo_path),
            tool_timeout: Duration::from_secs(tool_timeout_secs),
            allowed_extensions: lookup("ATTACHMENT_ALLOWED_EXTENSIONS")
                .map(|s| parse_extension_list(&s))
                .unwrap_or(defaults.allowed_extensions),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        };

        config.validate()?;
        tracing::debug!(
            temp_root = %config.temp_root.display(),
            unzip = %config.unzip_path.display(),
            zipinfo = %config.zipinfo_path.display(),
            timeout_secs = config.tool_timeout.as_secs(),
            allowed_extensions = config.allowed_extensions.len(),
            "Ingest configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ATTACHMENT_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.tool_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "ARCHIVE_TOOL_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        Ok(())
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

/// Parse a comma separated extension list into lowercase entries without dots.
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
