//! Database repositories for data access layer
//!
//! Editions, attachments and their payload history live in Postgres.
//! [`PgAttachmentStore`] implements the ingestion engine's store seam on top
//! of them.

pub mod attachment;
pub mod transaction;

pub use attachment::{AttachmentRow, EditionRow, PgAttachmentStore};
pub use transaction::TransactionGuard;
