use std::collections::HashSet;
use std::path::{Path, PathBuf};

use folio_core::IngestConfig;

use crate::archive::StagedArchive;
use crate::error::IngestError;

/// Extension allowlist gate for extracted archive contents.
///
/// Matching is case-sensitive against the configured list; a file without an
/// extension is checked as the empty string.
#[derive(Debug, Clone)]
pub struct ArchiveContentPolicy {
    allowed_extensions: HashSet<String>,
}

impl ArchiveContentPolicy {
    pub fn new<I, S>(allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_extensions: allowed_extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.allowed_extensions().iter().cloned())
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy())
            .unwrap_or_default();
        self.allowed_extensions.contains(extension.as_ref())
    }

    /// Fail with the base names of every disallowed file.
    pub fn validate(&self, paths: &[PathBuf]) -> Result<(), IngestError> {
        let rejected: Vec<String> = paths
            .iter()
            .filter(|p| !self.is_allowed(p))
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();

        if rejected.is_empty() {
            Ok(())
        } else {
            tracing::warn!(files = ?rejected, "Archive contains disallowed file types");
            Err(IngestError::DisallowedFileType { files: rejected })
        }
    }

    /// Presence, then structure, then content. Returns the extracted paths.
    #[tracing::instrument(skip(self, staged))]
    pub async fn check(&self, staged: Option<&StagedArchive>) -> Result<Vec<PathBuf>, IngestError> {
        let staged = staged.ok_or(IngestError::MissingArchive)?;

        if !staged.is_zip_file().await? {
            return Err(IngestError::NotAZipFile);
        }

        let paths = staged.extracted_file_paths().await?;
        self.validate(paths)?;
        Ok(paths.to_vec())
    }
}
