//! Private scratch area for one uploaded archive.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use folio_core::IngestConfig;
use tokio::sync::OnceCell;

use super::output::parse_extracted_paths;
use super::tools::ArchiveTools;
use crate::error::IngestError;

const STAGING_PREFIX: &str = "bulk-upload-";
const EXTRACTION_DIR: &str = "extracted";
const FALLBACK_FILENAME: &str = "upload.zip";

/// Reduce a client-supplied filename to a safe base name.
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Debug, Clone)]
enum UploadSource {
    Path(PathBuf),
    Bytes(Bytes),
}

/// An uploaded blob as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    original_filename: String,
    source: UploadSource,
}

impl UploadedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            original_filename,
            source: UploadSource::Path(path),
        }
    }

    pub fn from_bytes(original_filename: impl Into<String>, content: Bytes) -> Self {
        Self {
            original_filename: original_filename.into(),
            source: UploadSource::Bytes(content),
        }
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }
}

/// Creates staging areas under the configured temp root.
#[derive(Debug, Clone)]
pub struct ArchiveStager {
    temp_root: PathBuf,
    tools: ArchiveTools,
}

impl ArchiveStager {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            temp_root: config.temp_root().to_path_buf(),
            tools: ArchiveTools::from_config(config),
        }
    }

    /// Copy the upload into a fresh private directory.
    #[tracing::instrument(skip(self, upload), fields(upload.filename = %upload.original_filename()))]
    pub async fn stage(&self, upload: &UploadedFile) -> Result<StagedArchive, IngestError> {
        tokio::fs::create_dir_all(&self.temp_root)
            .await
            .map_err(|e| IngestError::staging("create temp root", e))?;

        let root = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.temp_root)
            .map_err(|e| IngestError::staging("create staging directory", e))?
            .keep();
        let root = match tokio::fs::canonicalize(&root).await {
            Ok(canonical) => canonical,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&root).await;
                return Err(IngestError::staging("resolve staging directory", e));
            }
        };

        let filename = sanitize_archive_filename(upload.original_filename(), FALLBACK_FILENAME);
        let archive_path = root.join(&filename);

        let copied = match &upload.source {
            UploadSource::Path(source) => tokio::fs::copy(source, &archive_path).await.map(|_| ()),
            UploadSource::Bytes(content) => tokio::fs::write(&archive_path, content).await,
        };
        if let Err(e) = copied {
            if let Err(cleanup_err) = tokio::fs::remove_dir_all(&root).await {
                tracing::warn!(
                    error = %cleanup_err,
                    path = %root.display(),
                    "Failed to remove staging directory after copy failure"
                );
            }
            return Err(IngestError::staging("copy upload into staging directory", e));
        }

        tracing::debug!(path = %archive_path.display(), "Upload staged");

        Ok(StagedArchive {
            root,
            archive_path,
            original_filename: upload.original_filename().to_string(),
            tools: self.tools.clone(),
            zip_check: OnceCell::new(),
            extraction: OnceCell::new(),
        })
    }
}

/// A staged upload. Extraction runs at most once; the directory tree lives
/// until [`StagedArchive::cleanup`] is called.
#[derive(Debug)]
pub struct StagedArchive {
    root: PathBuf,
    archive_path: PathBuf,
    original_filename: String,
    tools: ArchiveTools,
    zip_check: OnceCell<bool>,
    /// `None` records an extraction run that produced nothing usable.
    extraction: OnceCell<Option<Vec<PathBuf>>>,
}

impl StagedArchive {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn extraction_dir(&self) -> PathBuf {
        self.root.join(EXTRACTION_DIR)
    }

    /// Superficial structural check: the listing tool wrote nothing to stderr.
    pub async fn is_zip_file(&self) -> Result<bool, IngestError> {
        let is_zip = self
            .zip_check
            .get_or_try_init(|| async move {
                let output = self.tools.list(&self.archive_path).await?;
                let is_zip = output.stderr.trim().is_empty();
                if !is_zip {
                    tracing::debug!(
                        archive = %self.archive_path.display(),
                        stderr = %output.stderr.trim(),
                        "Listing tool rejected archive"
                    );
                }
                Ok::<_, IngestError>(is_zip)
            })
            .await?;
        Ok(*is_zip)
    }

    /// Absolute paths of the extracted files, in tool output order.
    pub async fn extracted_file_paths(&self) -> Result<&[PathBuf], IngestError> {
        let outcome = self
            .extraction
            .get_or_try_init(|| self.extract())
            .await?;
        outcome.as_deref().ok_or(IngestError::NotAZipFile)
    }

    #[tracing::instrument(skip(self), fields(archive = %self.archive_path.display()))]
    async fn extract(&self) -> Result<Option<Vec<PathBuf>>, IngestError> {
        let destination = self.extraction_dir();
        tokio::fs::create_dir_all(&destination)
            .await
            .map_err(|e| IngestError::staging("create extraction directory", e))?;

        let output = self.tools.extract(&self.archive_path, &destination).await?;
        let paths = parse_extracted_paths(&output.stdout, &destination);

        if !output.status.success() {
            tracing::warn!(
                exit_code = ?output.status.code(),
                extracted = paths.len(),
                stderr = %output.stderr.trim(),
                "Extraction tool exited with an error"
            );
            if paths.is_empty() {
                return Ok(None);
            }
        }

        tracing::info!(files = paths.len(), "Archive extracted");
        Ok(Some(paths))
    }

    /// Remove the whole staging tree. Safe to call repeatedly.
    pub async fn cleanup(&self) -> Result<(), IngestError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                tracing::debug!(path = %self.root.display(), "Staging directory removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IngestError::staging("remove staging directory", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn stager(temp_root: &Path) -> ArchiveStager {
        let config = IngestConfig {
            temp_root: temp_root.to_path_buf(),
            tool_timeout: Duration::from_secs(5),
            ..IngestConfig::default()
        };
        ArchiveStager::new(&config)
    }

    #[test]
    fn test_sanitize_archive_filename() {
        assert_eq!(sanitize_archive_filename("upload.zip", "x"), "upload.zip");
        assert_eq!(sanitize_archive_filename("../../etc/passwd", "x"), "passwd");
        assert_eq!(sanitize_archive_filename("dir/a.zip", "x"), "a.zip");
        assert_eq!(sanitize_archive_filename("..", "fallback.zip"), "fallback.zip");
        assert_eq!(sanitize_archive_filename("", "fallback.zip"), "fallback.zip");
    }

    #[tokio::test]
    async fn test_stage_copies_bytes_into_private_directory() {
        let temp = TempDir::new().unwrap();
        let upload = UploadedFile::from_bytes("../evil.zip", Bytes::from_static(b"PK"));

        let staged = stager(temp.path()).stage(&upload).await.unwrap();

        assert!(staged.root().is_dir());
        assert!(staged.root().starts_with(temp.path().canonicalize().unwrap()));
        assert_eq!(staged.archive_path(), staged.root().join("evil.zip"));
        assert_eq!(std::fs::read(staged.archive_path()).unwrap(), b"PK");
        assert_eq!(staged.extraction_dir(), staged.root().join("extracted"));
        staged.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_each_upload_gets_its_own_directory() {
        let temp = TempDir::new().unwrap();
        let stager = stager(temp.path());
        let upload = UploadedFile::from_bytes("a.zip", Bytes::from_static(b"PK"));

        let first = stager.stage(&upload).await.unwrap();
        let second = stager.stage(&upload).await.unwrap();

        assert_ne!(first.root(), second.root());
        first.cleanup().await.unwrap();
        second.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_missing_source_is_staging_error_and_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let upload = UploadedFile::from_path(temp.path().join("does-not-exist.zip"));
        let root = temp.path().join("scratch");

        let err = stager(&root).stage(&upload).await.unwrap_err();

        assert!(err.is_staging_error());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_without_extraction_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let upload = UploadedFile::from_bytes("a.zip", Bytes::from_static(b"PK"));
        let staged = stager(temp.path()).stage(&upload).await.unwrap();

        staged.cleanup().await.unwrap();
        assert!(!staged.root().exists());
        staged.cleanup().await.unwrap();
    }
}
