//! Persistence seam for editions and their attachments.
//!
//! The ingestion engine never talks to a database directly. It loads an
//! [`Edition`] through an [`AttachmentStore`] and hands back a batch of
//! [`AttachmentChange`]s which the store must apply all-or-nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Attachment, AttachmentData, Edition};

/// One unit of work produced by a validated bulk upload.
#[derive(Debug, Clone)]
pub enum AttachmentChange {
    /// Insert a new attachment; the store assigns its id and position.
    Insert(Attachment),
    /// Persist a new payload record and updated fields for an existing
    /// attachment (matched by id). The superseded payload record is kept.
    Replace(Attachment),
}

impl AttachmentChange {
    pub fn attachment(&self) -> &Attachment {
        match self {
            AttachmentChange::Insert(a) | AttachmentChange::Replace(a) => a,
        }
    }
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn load_edition(&self, edition_id: Uuid) -> Result<Option<Edition>, AppError>;

    /// Apply every change or none of them.
    ///
    /// Returns the persisted attachments in the same order as `changes`.
    async fn apply_changes(
        &self,
        edition_id: Uuid,
        changes: Vec<AttachmentChange>,
    ) -> Result<Vec<Attachment>, AppError>;
}

#[derive(Default)]
struct InMemoryState {
    editions: HashMap<Uuid, Edition>,
    superseded: Vec<AttachmentData>,
    fail_at_change: Option<usize>,
}

/// Process-local store with the same all-or-nothing semantics as the
/// database store. Used by the ingestion tests.
#[derive(Clone, Default)]
pub struct InMemoryAttachmentStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_edition(&self, edition: Edition) {
        self.state().editions.insert(edition.id, edition);
    }

    pub fn edition(&self, edition_id: Uuid) -> Option<Edition> {
        self.state().editions.get(&edition_id).cloned()
    }

    /// Payload records that have been replaced by newer ones.
    pub fn superseded_data(&self) -> Vec<AttachmentData> {
        self.state().superseded.clone()
    }

    /// Make the next `apply_changes` call fail when it reaches the change at
    /// `index`.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_on_change(&self, index: usize) {
        self.state().fail_at_change = Some(index);
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn load_edition(&self, edition_id: Uuid) -> Result<Option<Edition>, AppError> {
        Ok(self.edition(edition_id))
    }

    async fn apply_changes(
        &self,
        edition_id: Uuid,
        changes: Vec<AttachmentChange>,
    ) -> Result<Vec<Attachment>, AppError> {
        let mut state = self.state();
        let fail_at = state.fail_at_change.take();

        // Work on a copy so a failure part-way leaves the stored edition untouched.
        let mut edition = state
            .editions
            .get(&edition_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Edition {} not found", edition_id)))?;
        let mut superseded = Vec::new();
        let mut persisted = Vec::with_capacity(changes.len());

        for (index, change) in changes.into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(AppError::Internal(format!(
                    "injected failure at change {}",
                    index
                )));
            }

            match change {
                AttachmentChange::Insert(mut attachment) => {
                    attachment.id = Some(Uuid::new_v4());
                    edition.append_attachment(attachment);
                    if let Some(stored) = edition.attachments().last() {
                        persisted.push(stored.clone());
                    }
                }
                AttachmentChange::Replace(attachment) => {
                    let id = attachment.id.ok_or_else(|| {
                        AppError::InvalidInput("replacement has no attachment id".to_string())
                    })?;
                    let existing = edition.attachment_mut(id).ok_or_else(|| {
                        AppError::NotFound(format!("Attachment {} not found", id))
                    })?;
                    if let Some(previous) = existing.attachment_data.take() {
                        superseded.push(previous);
                    }
                    let ordering = existing.ordering;
                    *existing = attachment;
                    existing.ordering = ordering;
                    persisted.push(existing.clone());
                }
            }
        }

        state.editions.insert(edition_id, edition);
        state.superseded.extend(superseded);
        Ok(persisted)
    }
}
