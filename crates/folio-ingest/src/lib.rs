//! Folio Ingest
//!
//! Bulk attachment ingestion: stage an uploaded zip in a private scratch
//! directory, extract it with the external archive tools, gate its contents
//! on an extension allowlist, reconcile the files against an edition's
//! attachments by filename and commit the batch all-or-nothing.

pub mod archive;
pub mod error;
pub mod policy;
pub mod reconcile;
pub mod service;
pub mod transaction;

pub use archive::{ArchiveStager, ArchiveTools, StagedArchive, UploadedFile};
pub use error::IngestError;
pub use policy::ArchiveContentPolicy;
pub use reconcile::{
    AttachmentReconciler, ProposedAttachmentEntry, Reconciliation, WorkingAttachment,
};
pub use service::BulkUploadService;
pub use transaction::{
    commit, BulkIngestion, IngestionResult, RejectedSet, ValidatedSet,
    INCOMPLETE_ATTACHMENTS_MESSAGE,
};
