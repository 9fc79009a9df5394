//! Database operations for study groups.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, DatabaseError, utils::{parse_timestamp, parse_uuid}};
use crate::studyspace::error::StudyspaceError;
use crate::studyspace::groups::Group;
use crate::studyspace::join_key::JoinKey;

/// Internal database row representation for the groups table.
#[derive(Debug)]
struct GroupRow {
    id: Uuid,
    name: String,
    join_key: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for GroupRow
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let id = parse_uuid(row, "id")?;
        let name: String = row.try_get("name")?;
        let join_key: String = row.try_get("join_key")?;
        let created_by = parse_uuid(row, "created_by")?;
        let created_at = parse_timestamp(row, "created_at")?;

        Ok(Self {
            id,
            name,
            join_key,
            created_by,
            created_at,
        })
    }
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            join_key: JoinKey::from_stored(row.join_key),
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

impl Group {
    /// Inserts a new group. The join key's UNIQUE constraint surfaces a
    /// collision as [`DatabaseError::UniqueViolation`].
    pub(crate) async fn create(
        name: &str,
        join_key: &JoinKey,
        created_by: &Uuid,
        database: &Database,
    ) -> Result<Self, StudyspaceError> {
        let id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, GroupRow>(
            "INSERT INTO groups (id, name, join_key, created_by, created_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING *",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(join_key.as_str())
        .bind(created_by.to_string())
        .bind(now)
        .fetch_one(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.into())
    }

    /// Fetches a group by id, returning `None` if absent.
    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<Self>, StudyspaceError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(row.map(Into::into))
    }

    /// Looks up a group by its (already normalized) join key.
    pub(crate) async fn find_by_join_key(
        join_key: &str,
        database: &Database,
    ) -> Result<Option<Self>, StudyspaceError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE join_key = ?")
            .bind(join_key)
            .fetch_optional(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(row.map(Into::into))
    }

    /// Deletes a group row. Memberships and messages cascade.
    pub(crate) async fn delete(id: &Uuid, database: &Database) -> Result<(), StudyspaceError> {
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id.to_string())
            .execute(&database.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    /// All groups the user belongs to, newest first.
    pub(crate) async fn for_user(
        user_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<Self>, StudyspaceError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT g.* FROM groups g
               JOIN group_members gm ON gm.group_id = g.id
              WHERE gm.user_id = ?
              ORDER BY g.created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&database.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studyspace::users::User;

    async fn test_user(database: &Database) -> User {
        User::create("Tester", None, database).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_by_id() {
        let database = Database::new_in_memory().await.unwrap();
        let user = test_user(&database).await;
        let key = JoinKey::generate();

        let group = Group::create("Algorithms101", &key, &user.id, &database)
            .await
            .unwrap();

        let found = Group::find_by_id(&group.id, &database)
            .await
            .unwrap()
            .expect("group should exist");
        assert_eq!(found.name, "Algorithms101");
        assert_eq!(found.join_key, key);
        assert_eq!(found.created_by, user.id);
    }

    #[tokio::test]
    async fn test_find_by_join_key() {
        let database = Database::new_in_memory().await.unwrap();
        let user = test_user(&database).await;
        let key = JoinKey::generate();
        let group = Group::create("Physics", &key, &user.id, &database)
            .await
            .unwrap();

        let found = Group::find_by_join_key(key.as_str(), &database)
            .await
            .unwrap()
            .expect("lookup by join key should succeed");
        assert_eq!(found.id, group.id);

        let missing = Group::find_by_join_key("ZZZZ9999", &database)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_join_key_is_rejected_by_constraint() {
        let database = Database::new_in_memory().await.unwrap();
        let user = test_user(&database).await;
        let key = JoinKey::generate();

        Group::create("First", &key, &user.id, &database)
            .await
            .unwrap();
        let result = Group::create("Second", &key, &user.id, &database).await;

        assert!(matches!(
            result,
            Err(StudyspaceError::Database(DatabaseError::UniqueViolation))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_memberships() {
        let database = Database::new_in_memory().await.unwrap();
        let user = test_user(&database).await;
        let group = Group::create("Doomed", &JoinKey::generate(), &user.id, &database)
            .await
            .unwrap();
        crate::studyspace::groups::Membership::create(&group.id, &user.id, &database)
            .await
            .unwrap();

        Group::delete(&group.id, &database).await.unwrap();

        assert!(Group::find_by_id(&group.id, &database).await.unwrap().is_none());
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM group_members")
            .fetch_one(&database.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_for_user_lists_only_joined_groups() {
        let database = Database::new_in_memory().await.unwrap();
        let alice = test_user(&database).await;
        let bob = User::create("Bob", None, &database).await.unwrap();

        let joined = Group::create("Joined", &JoinKey::generate(), &alice.id, &database)
            .await
            .unwrap();
        crate::studyspace::groups::Membership::create(&joined.id, &alice.id, &database)
            .await
            .unwrap();

        let other = Group::create("Other", &JoinKey::generate(), &bob.id, &database)
            .await
            .unwrap();
        crate::studyspace::groups::Membership::create(&other.id, &bob.id, &database)
            .await
            .unwrap();

        let groups = Group::for_user(&alice.id, &database).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, joined.id);
    }
}
