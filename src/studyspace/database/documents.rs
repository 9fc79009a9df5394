//! Database operations for uploaded document metadata.
//!
//! The blob itself lives in [`crate::studyspace::storage`]; rows here only
//! describe it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, DatabaseError, utils::{parse_timestamp, parse_uuid}};
use crate::studyspace::documents::Document;
use crate::studyspace::error::StudyspaceError;

/// Internal database row representation for the documents table.
#[derive(Debug)]
struct DocumentRow {
    id: Uuid,
    owner_id: Uuid,
    subject: Option<String>,
    file_name: String,
    stored_name: String,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for DocumentRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let id = parse_uuid(row, "id")?;
        let owner_id = parse_uuid(row, "owner_id")?;
        let subject: Option<String> = row.try_get("subject")?;
        let file_name: String = row.try_get("file_name")?;
        let stored_name: String = row.try_get("stored_name")?;
        let size_bytes: i64 = row.try_get("size_bytes")?;
        let uploaded_at = parse_timestamp(row, "uploaded_at")?;

        Ok(Self {
            id,
            owner_id,
            subject,
            file_name,
            stored_name,
            size_bytes,
            uploaded_at,
        })
    }
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            subject: row.subject,
            file_name: row.file_name,
            stored_name: row.stored_name,
            size_bytes: row.size_bytes as u64,
            uploaded_at: row.uploaded_at,
        }
    }
}

impl Document {
    pub(crate) async fn create(
        id: &Uuid,
        owner_id: &Uuid,
        subject: Option<&str>,
        file_name: &str,
        stored_name: &str,
        size_bytes: u64,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, DocumentRow>(
            "INSERT INTO documents
                 (id, owner_id, subject, file_name, stored_name, size_bytes, uploaded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               RETURNING *",
        )
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .bind(subject)
        .bind(file_name)
        .bind(stored_name)
        .bind(size_bytes as i64)
        .bind(now)
        .fetch_one(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.into())
    }

    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<Self>, StudyspaceError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(row.map(Into::into))
    }

    /// Documents owned by the user, newest first.
    pub(crate) async fn for_owner(
        owner_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<Self>, StudyspaceError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE owner_id = ? ORDER BY uploaded_at DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub(crate) async fn delete(id: &Uuid, database: &Database) -> Result<(), StudyspaceError> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }
}
