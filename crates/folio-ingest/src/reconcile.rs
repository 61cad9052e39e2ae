//! Matching proposed files against an edition's existing attachments.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use folio_core::{Attachment, AttachmentData, AttachmentParams, Edition, FieldErrors};
use uuid::Uuid;

use crate::error::IngestError;

/// A file (and optional metadata) proposed for an edition.
#[derive(Debug, Clone, Default)]
pub struct ProposedAttachmentEntry {
    pub params: AttachmentParams,
    pub file: Option<AttachmentData>,
}

impl ProposedAttachmentEntry {
    pub fn new(params: AttachmentParams, file: Option<AttachmentData>) -> Self {
        Self { params, file }
    }

    pub fn with_file(filename: impl Into<String>, content: Bytes) -> Self {
        Self::new(
            AttachmentParams::default(),
            Some(AttachmentData::new(filename, content)),
        )
    }

    /// Read a file from disk; the entry's filename is the path's base name.
    pub async fn from_path(path: &Path) -> Result<Self, IngestError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| IngestError::UnreadableFile {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::with_file(filename, Bytes::from(content)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    New,
    Replacement {
        attachment_id: Uuid,
        previous_data_id: Option<Uuid>,
    },
}

/// One member of the in-memory working set.
#[derive(Debug, Clone)]
pub struct WorkingAttachment {
    pub reconciliation: Reconciliation,
    pub attachment: Attachment,
    errors: FieldErrors,
}

impl WorkingAttachment {
    fn new(reconciliation: Reconciliation, attachment: Attachment) -> Self {
        Self {
            reconciliation,
            attachment,
            errors: FieldErrors::new(),
        }
    }

    pub fn is_replacement(&self) -> bool {
        matches!(self.reconciliation, Reconciliation::Replacement { .. })
    }

    /// Id of the existing attachment this entry replaces.
    pub fn replaces(&self) -> Option<Uuid> {
        match self.reconciliation {
            Reconciliation::Replacement { attachment_id, .. } => Some(attachment_id),
            Reconciliation::New => None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.attachment.filename()
    }

    /// Errors recorded by the last [`validate`](Self::validate) call.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn validate(&mut self) -> bool {
        self.errors = self.attachment.field_errors();
        self.errors.is_empty()
    }

    /// Overlay user-supplied metadata, e.g. titles entered after upload.
    pub fn apply(&mut self, params: &AttachmentParams) {
        params.apply_to(&mut self.attachment);
    }
}

/// Builds working attachments without persisting anything.
pub struct AttachmentReconciler;

impl AttachmentReconciler {
    pub fn reconcile(
        edition: &Edition,
        entries: Vec<ProposedAttachmentEntry>,
    ) -> Vec<WorkingAttachment> {
        entries
            .into_iter()
            .map(|entry| Self::reconcile_entry(edition, entry))
            .collect()
    }

    fn reconcile_entry(edition: &Edition, entry: ProposedAttachmentEntry) -> WorkingAttachment {
        let ProposedAttachmentEntry { params, file } = entry;

        let Some(file) = file else {
            let mut attachment = Attachment::blank();
            params.apply_to(&mut attachment);
            return WorkingAttachment::new(Reconciliation::New, attachment);
        };

        let existing = edition
            .attachment_with_filename(file.filename())
            .and_then(|a| a.id.map(|id| (id, a)));

        match existing {
            Some((attachment_id, existing)) => {
                let previous = existing.attachment_data.as_ref();
                let data = match previous {
                    Some(previous) => file.replacing(previous),
                    None => file,
                };
                tracing::debug!(
                    attachment_id = %attachment_id,
                    filename = %data.filename(),
                    "Replacing attachment payload"
                );

                let mut attachment = existing.clone();
                attachment.attachment_data = Some(data);
                params.apply_to(&mut attachment);
                WorkingAttachment::new(
                    Reconciliation::Replacement {
                        attachment_id,
                        previous_data_id: previous.map(|d| d.id),
                    },
                    attachment,
                )
            }
            None => {
                let mut attachment = Attachment::with_data(file);
                params.apply_to(&mut attachment);
                WorkingAttachment::new(Reconciliation::New, attachment)
            }
        }
    }

    /// One entry per path, no metadata overrides.
    pub async fn from_file_paths(
        edition: &Edition,
        paths: &[PathBuf],
    ) -> Result<Vec<WorkingAttachment>, IngestError> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            entries.push(ProposedAttachmentEntry::from_path(path).await?);
        }
        Ok(Self::reconcile(edition, entries))
    }
}
