use std::path::PathBuf;

use folio_core::{Edition, IngestConfig};

use crate::archive::{ArchiveStager, StagedArchive, UploadedFile};
use crate::error::IngestError;
use crate::policy::ArchiveContentPolicy;
use crate::reconcile::AttachmentReconciler;
use crate::transaction::BulkIngestion;

/// Runs one upload from staging to a reconciled working set.
///
/// The staging directory is removed before returning, whatever the outcome.
/// The working set owns its file contents, so it outlives the directory.
#[derive(Debug, Clone)]
pub struct BulkUploadService {
    stager: ArchiveStager,
    policy: ArchiveContentPolicy,
}

impl BulkUploadService {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            stager: ArchiveStager::new(config),
            policy: ArchiveContentPolicy::from_config(config),
        }
    }

    /// Stage, check and reconcile a zip upload against `edition`.
    #[tracing::instrument(skip(self, edition, upload), fields(edition_id = %edition.id))]
    pub async fn prepare_zip(
        &self,
        edition: &Edition,
        upload: Option<&UploadedFile>,
    ) -> Result<BulkIngestion, IngestError> {
        let upload = upload.ok_or(IngestError::MissingArchive)?;
        let staged = self.stager.stage(upload).await?;

        let result = async {
            let paths = self.policy.check(Some(&staged)).await?;
            let working = AttachmentReconciler::from_file_paths(edition, &paths).await?;
            Ok::<_, IngestError>(BulkIngestion::new(edition, working))
        }
        .await;

        Self::cleanup(&staged).await;
        result
    }

    /// Reconcile loose files (a non-archive multi-file upload).
    pub async fn prepare_files(
        &self,
        edition: &Edition,
        paths: &[PathBuf],
    ) -> Result<BulkIngestion, IngestError> {
        let working = AttachmentReconciler::from_file_paths(edition, paths).await?;
        Ok(BulkIngestion::new(edition, working))
    }

    /// Base names of the files an archive would contribute.
    #[tracing::instrument(skip(self, upload), fields(upload.filename = %upload.original_filename()))]
    pub async fn inspect(&self, upload: &UploadedFile) -> Result<Vec<String>, IngestError> {
        let staged = self.stager.stage(upload).await?;

        let result = self.policy.check(Some(&staged)).await.map(|paths| {
            paths
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect()
        });

        Self::cleanup(&staged).await;
        result
    }

    async fn cleanup(staged: &StagedArchive) {
        if let Err(e) = staged.cleanup().await {
            tracing::error!(
                error = %e,
                path = %staged.root().display(),
                "Failed to remove staging directory"
            );
        }
    }
}
