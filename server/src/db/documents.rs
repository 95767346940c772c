//! Store gateway over the `documents` table.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use stockroom_engine::{Document, Error as EngineError, StoreGateway};

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub doc_key: String,
    pub fields: serde_json::Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            doc_key: row.try_get("doc_key")?,
            fields: row.try_get("fields")?,
        })
    }
}

impl StoredDocument {
    /// Convert database row to an engine document.
    pub fn into_document(self) -> Document {
        Document::new(self.doc_key, self.fields)
    }
}

/// [`StoreGateway`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreGateway for PgGateway {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, EngineError> {
        let rows = sqlx::query_as::<_, StoredDocument>(
            r#"
            SELECT doc_key, fields
            FROM documents
            WHERE collection = $1
            ORDER BY doc_key ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(rows.into_iter().map(StoredDocument::into_document).collect())
    }

    async fn get_by_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, EngineError> {
        let row = sqlx::query_as::<_, StoredDocument>(
            r#"
            SELECT doc_key, fields
            FROM documents
            WHERE collection = $1 AND doc_key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(row.map(|r| r.fields))
    }

    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        fields: serde_json::Value,
    ) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_key, fields, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (collection, doc_key) DO UPDATE SET
                fields = EXCLUDED.fields,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(&fields)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(collection, key, e))?;

        Ok(())
    }

    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<(), EngineError> {
        sqlx::query(r#"DELETE FROM documents WHERE collection = $1 AND doc_key = $2"#)
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(collection, key, e))?;

        Ok(())
    }
}

/// Any failure while reading means the store could not serve us.
fn read_error(e: sqlx::Error) -> EngineError {
    tracing::warn!("Document read failed: {}", e);
    EngineError::StoreUnavailable(e.to_string())
}

/// Errors reported by the database itself are refusals; everything else is
/// a transport problem.
fn write_error(collection: &str, key: &str, e: sqlx::Error) -> EngineError {
    tracing::warn!(collection, key, "Document write failed: {}", e);
    match e {
        sqlx::Error::Database(db_err) => EngineError::StoreWriteRejected {
            collection: collection.to_string(),
            key: key.to_string(),
            reason: db_err.message().to_string(),
        },
        other => EngineError::StoreUnavailable(other.to_string()),
    }
}
