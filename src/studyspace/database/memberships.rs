//! Database operations for group memberships.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, DatabaseError, utils::{parse_timestamp, parse_uuid}};
use crate::studyspace::error::StudyspaceError;
use crate::studyspace::groups::Membership;
use crate::studyspace::users::User;

/// Internal database row representation for the group_members table.
#[derive(Debug)]
struct MembershipRow {
    id: i64,
    group_id: Uuid,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for MembershipRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let group_id = parse_uuid(row, "group_id")?;
        let user_id = parse_uuid(row, "user_id")?;
        let joined_at = parse_timestamp(row, "joined_at")?;

        Ok(Self {
            id,
            group_id,
            user_id,
            joined_at,
        })
    }
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: Some(row.id),
            group_id: row.group_id,
            user_id: row.user_id,
            joined_at: row.joined_at,
        }
    }
}

impl Membership {
    /// Inserts a membership. A duplicate (group, user) pair surfaces as
    /// [`DatabaseError::UniqueViolation`].
    pub(crate) async fn create(
        group_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, MembershipRow>(
            "INSERT INTO group_members (group_id, user_id, joined_at)
               VALUES (?, ?, ?)
               RETURNING *",
        )
        .bind(group_id.to_string())
        .bind(user_id.to_string())
        .bind(now)
        .fetch_one(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.into())
    }

    /// Whether (group, user) already has a membership row.
    pub(crate) async fn exists(
        group_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<bool, StudyspaceError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&database.pool)
                .await
                .map_err(DatabaseError::from)?;

        Ok(row.is_some())
    }

    /// Users belonging to the group, in join order.
    pub(crate) async fn members_of(
        group_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<User>, StudyspaceError> {
        let rows = sqlx::query_as::<_, super::users::UserRow>(
            "SELECT u.* FROM users u
               JOIN group_members gm ON gm.user_id = u.id
              WHERE gm.group_id = ?
              ORDER BY gm.joined_at ASC, gm.id ASC",
        )
        .bind(group_id.to_string())
        .fetch_all(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
