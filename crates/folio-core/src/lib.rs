//! Folio Core Library
//!
//! This crate provides the domain models (editions, attachments, payload
//! records), error types, configuration and the persistence seam shared by
//! all Folio components.

pub mod config;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::IngestConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Attachment, AttachmentData, AttachmentParams, Edition, FieldErrors};
pub use store::{AttachmentChange, AttachmentStore, InMemoryAttachmentStore};
