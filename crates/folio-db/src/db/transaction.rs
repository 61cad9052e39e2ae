//! Database transaction utilities
//!
//! Multi-statement writes (a bulk ingestion commit touches several tables)
//! run inside a [`TransactionGuard`] so they land together or not at all.

use folio_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction wrapper with explicit commit/rollback.
///
/// A guard dropped without `commit` is rolled back by sqlx when the
/// underlying transaction is dropped.
///
/// # Example
///
/// ```ignore
/// use folio_db::db::transaction::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), folio_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("INSERT INTO ...").execute(tx.connection()?).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on inside this transaction.
    pub fn connection(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::Internal("Transaction was already committed or rolled back".to_string())
        })
    }

    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
