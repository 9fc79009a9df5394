//! Database operations for user profiles.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, DatabaseError, utils::{parse_timestamp, parse_uuid}};
use crate::studyspace::error::StudyspaceError;
use crate::studyspace::users::User;

/// Internal database row representation for the users table.
#[derive(Debug)]
pub(super) struct UserRow {
    id: Uuid,
    display_name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for UserRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let id = parse_uuid(row, "id")?;
        let display_name: String = row.try_get("display_name")?;
        let email: Option<String> = row.try_get("email")?;
        let created_at = parse_timestamp(row, "created_at")?;

        Ok(Self {
            id,
            display_name,
            email,
            created_at,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

impl User {
    /// Inserts a new user profile and returns the persisted row.
    pub(crate) async fn create(
        display_name: &str,
        email: Option<&str>,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, display_name, email, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING *",
        )
        .bind(id.to_string())
        .bind(display_name)
        .bind(email)
        .bind(now)
        .fetch_one(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.into())
    }

    /// Fetches a user by id, returning `None` if absent.
    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<Self>, StudyspaceError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(row.map(Into::into))
    }

    /// Replaces the display name shown next to this user's messages.
    pub(crate) async fn update_display_name(
        id: &Uuid,
        display_name: &str,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET display_name = ? WHERE id = ? RETURNING *",
        )
        .bind(display_name)
        .bind(id.to_string())
        .fetch_optional(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(Into::into).ok_or(StudyspaceError::UserNotFound)
    }
}
