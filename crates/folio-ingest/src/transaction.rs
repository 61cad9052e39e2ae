//! Two-phase validate/commit of a reconciled working set.
//!
//! [`BulkIngestion::validate_all`] is the only way to obtain a
//! [`ValidatedSet`], and [`commit`] only accepts one, so an unvalidated batch
//! cannot reach the store. A commit either applies every change or none.

use std::collections::BTreeMap;

use folio_core::{AttachmentChange, AttachmentStore, Edition, FieldErrors};
use serde::Serialize;
use uuid::Uuid;

use crate::error::IngestError;
use crate::reconcile::WorkingAttachment;

pub const INCOMPLETE_ATTACHMENTS_MESSAGE: &str = "Please enter missing fields for each attachment";

/// A reconciled working set bound to the edition it was built against.
#[derive(Debug, Clone)]
pub struct BulkIngestion {
    edition_id: Uuid,
    attachments: Vec<WorkingAttachment>,
}

impl BulkIngestion {
    pub fn new(edition: &Edition, attachments: Vec<WorkingAttachment>) -> Self {
        Self {
            edition_id: edition.id,
            attachments,
        }
    }

    pub fn edition_id(&self) -> Uuid {
        self.edition_id
    }

    pub fn attachments(&self) -> &[WorkingAttachment] {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut [WorkingAttachment] {
        &mut self.attachments
    }

    /// Working attachment whose payload has this filename.
    pub fn attachment_with_filename_mut(&mut self, filename: &str) -> Option<&mut WorkingAttachment> {
        self.attachments
            .iter_mut()
            .find(|a| a.filename() == Some(filename))
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Validate every attachment. Entry errors stay on each entry.
    pub fn validate_all(mut self) -> Result<ValidatedSet, RejectedSet> {
        let mut all_valid = true;
        for attachment in &mut self.attachments {
            all_valid &= attachment.validate();
        }

        if all_valid {
            Ok(ValidatedSet {
                edition_id: self.edition_id,
                attachments: self.attachments,
            })
        } else {
            let invalid = self
                .attachments
                .iter()
                .filter(|a| !a.errors().is_empty())
                .count();
            tracing::warn!(
                edition_id = %self.edition_id,
                invalid,
                total = self.attachments.len(),
                "Bulk ingestion rejected"
            );
            Err(RejectedSet {
                base_errors: vec![INCOMPLETE_ATTACHMENTS_MESSAGE.to_string()],
                attachments: self.attachments,
            })
        }
    }

    /// Validate, then commit when everything is valid.
    pub async fn save_to_edition(
        self,
        store: &dyn AttachmentStore,
        edition: &mut Edition,
    ) -> Result<IngestionResult, IngestError> {
        match self.validate_all() {
            Ok(validated) => commit(store, edition, validated).await,
            Err(rejected) => Ok(rejected.into_result()),
        }
    }
}

/// Every attachment passed validation.
#[derive(Debug)]
pub struct ValidatedSet {
    edition_id: Uuid,
    attachments: Vec<WorkingAttachment>,
}

impl ValidatedSet {
    pub fn edition_id(&self) -> Uuid {
        self.edition_id
    }

    pub fn attachments(&self) -> &[WorkingAttachment] {
        &self.attachments
    }
}

/// At least one attachment failed validation; nothing was committed.
#[derive(Debug)]
pub struct RejectedSet {
    pub base_errors: Vec<String>,
    pub attachments: Vec<WorkingAttachment>,
}

impl RejectedSet {
    /// Field errors keyed by entry position, invalid entries only.
    pub fn entry_errors(&self) -> BTreeMap<usize, FieldErrors> {
        self.attachments
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.errors().is_empty())
            .map(|(i, a)| (i, a.errors().clone()))
            .collect()
    }

    pub fn into_result(self) -> IngestionResult {
        IngestionResult::Rejected {
            entry_errors: self.entry_errors(),
            base_errors: self.base_errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestionResult {
    Committed {
        attachment_ids: Vec<Uuid>,
        inserted: usize,
        replaced: usize,
    },
    Rejected {
        base_errors: Vec<String>,
        entry_errors: BTreeMap<usize, FieldErrors>,
    },
}

impl IngestionResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, IngestionResult::Committed { .. })
    }
}

/// Persist a validated set. `edition` is updated only once the store has
/// applied every change.
#[tracing::instrument(skip(store, edition, set), fields(edition_id = %edition.id, attachments = set.attachments.len()))]
pub async fn commit(
    store: &dyn AttachmentStore,
    edition: &mut Edition,
    set: ValidatedSet,
) -> Result<IngestionResult, IngestError> {
    if set.edition_id != edition.id {
        return Err(IngestError::NotValidated(format!(
            "set was validated against edition {}, not {}",
            set.edition_id, edition.id
        )));
    }

    let mut changes = Vec::with_capacity(set.attachments.len());
    for working in set.attachments {
        match working.replaces() {
            Some(attachment_id) => {
                if edition.attachment(attachment_id).is_none() {
                    return Err(IngestError::NotValidated(format!(
                        "attachment {} is no longer part of edition {}",
                        attachment_id, edition.id
                    )));
                }
                changes.push(AttachmentChange::Replace(working.attachment));
            }
            None => changes.push(AttachmentChange::Insert(working.attachment)),
        }
    }

    let persisted = store.apply_changes(edition.id, changes.clone()).await?;

    let mut inserted = 0;
    let mut replaced = 0;
    for (change, stored) in changes.iter().zip(&persisted) {
        match change {
            AttachmentChange::Insert(_) => {
                edition.append_attachment(stored.clone());
                inserted += 1;
            }
            AttachmentChange::Replace(_) => {
                if let Some(id) = stored.id {
                    if let Some(existing) = edition.attachment_mut(id) {
                        let ordering = existing.ordering;
                        *existing = stored.clone();
                        existing.ordering = ordering;
                    }
                }
                replaced += 1;
            }
        }
    }

    let attachment_ids: Vec<Uuid> = persisted.iter().filter_map(|a| a.id).collect();
    tracing::info!(inserted, replaced, "Bulk ingestion committed");

    Ok(IngestionResult::Committed {
        attachment_ids,
        inserted,
        replaced,
    })
}
