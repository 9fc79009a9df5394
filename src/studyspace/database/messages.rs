//! Database operations for chat messages.
//!
//! Reads join the users table so every message carries its author's display
//! name, matching what the chat view renders.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, DatabaseError, utils::{parse_timestamp, parse_uuid}};
use crate::studyspace::error::StudyspaceError;
use crate::studyspace::messages::Message;

const MESSAGE_COLUMNS: &str = "m.id, m.group_id, m.author_id, m.content, m.created_at,
        u.display_name AS author_name";

/// Internal database row representation for the messages table joined with
/// the author's profile.
#[derive(Debug)]
struct MessageRow {
    id: Uuid,
    group_id: Uuid,
    author_id: Uuid,
    author_name: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for MessageRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let id = parse_uuid(row, "id")?;
        let group_id = parse_uuid(row, "group_id")?;
        let author_id = parse_uuid(row, "author_id")?;
        let author_name: Option<String> = row.try_get("author_name")?;
        let content: String = row.try_get("content")?;
        let created_at = parse_timestamp(row, "created_at")?;

        Ok(Self {
            id,
            group_id,
            author_id,
            author_name,
            content,
            created_at,
        })
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            author_id: row.author_id,
            author_name: row.author_name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

impl Message {
    /// Inserts a message and returns it with the author's display name
    /// resolved.
    pub(crate) async fn create(
        group_id: &Uuid,
        author_id: &Uuid,
        content: &str,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            "INSERT INTO messages (id, group_id, author_id, content, created_at)
               VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(group_id.to_string())
        .bind(author_id.to_string())
        .bind(content)
        .bind(now)
        .execute(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Self::find_by_id(&id, database)
            .await?
            .ok_or(StudyspaceError::MessageNotFound)
    }

    /// Fetches a single message (with author name) by id.
    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<Self>, StudyspaceError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS}
               FROM messages m
               LEFT JOIN users u ON u.id = m.author_id
              WHERE m.id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(Into::into))
    }

    /// All messages for a group, ascending by creation time (id breaks ties
    /// so the order is total).
    pub(crate) async fn for_group(
        group_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<Self>, StudyspaceError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS}
               FROM messages m
               LEFT JOIN users u ON u.id = m.author_id
              WHERE m.group_id = ?
              ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(group_id.to_string())
        .fetch_all(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
