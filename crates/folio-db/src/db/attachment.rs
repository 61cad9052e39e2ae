//! Edition and attachment persistence for bulk ingestion.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use folio_core::{Attachment, AttachmentChange, AttachmentData, AppError, AttachmentStore, Edition};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::transaction::TransactionGuard;

const ATTACHMENT_COLUMNS: &str = r#"
    a.id, a.title, a.accessible, a.isbn, a.unique_reference, a.command_paper_number,
    a.order_url, a.price, a.ordering,
    d.id AS data_id, d.original_filename, d.content_type, d.file_size, d.checksum,
    d.replaces, d.created_at AS data_created_at
"#;

/// Row type for editions table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct EditionRow {
    pub id: Uuid,
    pub title: String,
}

/// Row type for an attachment joined with its current payload record.
///
/// Payload bytes are not selected; loaded attachments carry empty content.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentRow {
    pub id: Uuid,
    pub title: String,
    pub accessible: bool,
    pub isbn: Option<String>,
    pub unique_reference: Option<String>,
    pub command_paper_number: Option<String>,
    pub order_url: Option<String>,
    pub price: Option<String>,
    pub ordering: i32,
    pub data_id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub checksum: String,
    pub replaces: Option<Uuid>,
    pub data_created_at: DateTime<Utc>,
}

impl AttachmentRow {
    pub fn to_attachment(self) -> Attachment {
        Attachment {
            id: Some(self.id),
            title: self.title,
            accessible: self.accessible,
            isbn: self.isbn,
            unique_reference: self.unique_reference,
            command_paper_number: self.command_paper_number,
            order_url: self.order_url,
            price: self.price,
            ordering: self.ordering,
            attachment_data: Some(AttachmentData {
                id: self.data_id,
                original_filename: self.original_filename,
                content_type: self.content_type,
                file_size: self.file_size,
                checksum: self.checksum,
                replaces: self.replaces,
                created_at: self.data_created_at,
                content: Bytes::new(),
            }),
        }
    }
}

/// Postgres-backed [`AttachmentStore`]. Each `apply_changes` call runs in a
/// single transaction.
#[derive(Clone)]
pub struct PgAttachmentStore {
    pool: PgPool,
}

impl PgAttachmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an edition with no attachments.
    #[tracing::instrument(skip(self), fields(db.table = "editions", db.operation = "insert"))]
    pub async fn create_edition(&self, title: &str) -> Result<Edition, AppError> {
        let row = sqlx::query_as::<Postgres, EditionRow>(
            "INSERT INTO editions (id, title) VALUES ($1, $2) RETURNING id, title",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(Edition::new(row.id, row.title))
    }

    async fn insert_data(conn: &mut PgConnection, data: &AttachmentData) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO attachment_data
                (id, original_filename, content_type, file_size, checksum, replaces, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(data.id)
        .bind(&data.original_filename)
        .bind(&data.content_type)
        .bind(data.file_size)
        .bind(&data.checksum)
        .bind(data.replaces)
        .bind(&data.content[..])
        .bind(data.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn insert_attachment(
        conn: &mut PgConnection,
        edition_id: Uuid,
        mut attachment: Attachment,
        ordering: i32,
    ) -> Result<Attachment, AppError> {
        let data = attachment.attachment_data.as_ref().ok_or_else(|| {
            AppError::InvalidInput("attachment has no file payload".to_string())
        })?;
        Self::insert_data(&mut *conn, data).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO attachments
                (id, edition_id, title, accessible, isbn, unique_reference,
                 command_paper_number, order_url, price, ordering, attachment_data_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(edition_id)
        .bind(&attachment.title)
        .bind(attachment.accessible)
        .bind(&attachment.isbn)
        .bind(&attachment.unique_reference)
        .bind(&attachment.command_paper_number)
        .bind(&attachment.order_url)
        .bind(&attachment.price)
        .bind(ordering)
        .bind(data.id)
        .execute(&mut *conn)
        .await?;

        attachment.id = Some(id);
        attachment.ordering = ordering;
        Ok(attachment)
    }

    async fn replace_attachment(
        conn: &mut PgConnection,
        edition_id: Uuid,
        mut attachment: Attachment,
    ) -> Result<Attachment, AppError> {
        let id = attachment.id.ok_or_else(|| {
            AppError::InvalidInput("replacement has no attachment id".to_string())
        })?;
        let data = attachment.attachment_data.as_ref().ok_or_else(|| {
            AppError::InvalidInput("attachment has no file payload".to_string())
        })?;
        Self::insert_data(&mut *conn, data).await?;

        let ordering = sqlx::query_scalar::<Postgres, i32>(
            r#"
            UPDATE attachments
            SET title = $3, accessible = $4, isbn = $5, unique_reference = $6,
                command_paper_number = $7, order_url = $8, price = $9,
                attachment_data_id = $10, updated_at = NOW()
            WHERE id = $1 AND edition_id = $2
            RETURNING ordering
            "#,
        )
        .bind(id)
        .bind(edition_id)
        .bind(&attachment.title)
        .bind(attachment.accessible)
        .bind(&attachment.isbn)
        .bind(&attachment.unique_reference)
        .bind(&attachment.command_paper_number)
        .bind(&attachment.order_url)
        .bind(&attachment.price)
        .bind(data.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attachment {} not found", id)))?;

        attachment.ordering = ordering;
        Ok(attachment)
    }
}

#[async_trait]
impl AttachmentStore for PgAttachmentStore {
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.operation = "select", db.record_id = %edition_id))]
    async fn load_edition(&self, edition_id: Uuid) -> Result<Option<Edition>, AppError> {
        let edition = sqlx::query_as::<Postgres, EditionRow>(
            "SELECT id, title FROM editions WHERE id = $1",
        )
        .bind(edition_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(edition) = edition else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<Postgres, AttachmentRow>(&format!(
            "SELECT {} FROM attachments a \
             JOIN attachment_data d ON d.id = a.attachment_data_id \
             WHERE a.edition_id = $1 ORDER BY a.ordering ASC",
            ATTACHMENT_COLUMNS
        ))
        .bind(edition_id)
        .fetch_all(&self.pool)
        .await?;

        let attachments = rows.into_iter().map(AttachmentRow::to_attachment).collect();
        Ok(Some(
            Edition::new(edition.id, edition.title).with_attachments(attachments),
        ))
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "attachments", db.operation = "upsert", db.record_id = %edition_id, changes = changes.len()))]
    async fn apply_changes(
        &self,
        edition_id: Uuid,
        changes: Vec<AttachmentChange>,
    ) -> Result<Vec<Attachment>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        // Lock the edition so concurrent commits cannot interleave positions.
        let locked = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM editions WHERE id = $1 FOR UPDATE",
        )
        .bind(edition_id)
        .fetch_optional(tx.connection()?)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Edition {} not found", edition_id)));
        }

        let mut next_ordering = sqlx::query_scalar::<Postgres, i32>(
            "SELECT COALESCE(MAX(ordering) + 1, 0) FROM attachments WHERE edition_id = $1",
        )
        .bind(edition_id)
        .fetch_one(tx.connection()?)
        .await?;

        let mut persisted = Vec::with_capacity(changes.len());
        for change in changes {
            let result = match change {
                AttachmentChange::Insert(attachment) => {
                    let ordering = next_ordering;
                    next_ordering += 1;
                    Self::insert_attachment(tx.connection()?, edition_id, attachment, ordering)
                        .await
                }
                AttachmentChange::Replace(attachment) => {
                    Self::replace_attachment(tx.connection()?, edition_id, attachment).await
                }
            };

            match result {
                Ok(attachment) => persisted.push(attachment),
                Err(e) => {
                    tracing::warn!(error = %e, "Rolling back attachment changes");
                    tx.rollback().await?;
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        Ok(persisted)
    }
}
