//! Group lifecycle: creation with join-key issuance, join-by-key, and
//! membership queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::database::DatabaseError;
use crate::studyspace::error::{Result, StudyspaceError};
use crate::studyspace::join_key::JoinKey;
use crate::studyspace::users::User;

const GROUP_NAME_MIN_CHARS: usize = 3;
const GROUP_NAME_MAX_CHARS: usize = 50;

/// A study group, joinable via its [`JoinKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub join_key: JoinKey,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A (group, user) join record, unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// `None` when constructing for save, `Some(...)` when returned from the
    /// database.
    pub id: Option<i64>,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

impl Studyspace {
    /// Creates a group and auto-joins the creator.
    ///
    /// The join key is random and unchecked at generation time; a collision
    /// trips the UNIQUE constraint and surfaces as `DuplicateJoinKey`, which
    /// the caller resolves by retrying. If the creator's membership insert
    /// fails after the group row exists, the group is deleted again so no
    /// memberless group is left behind; when that cleanup also fails the
    /// error names the orphaned group.
    pub async fn create_group(&self, name: &str, creator_id: &Uuid) -> Result<Group> {
        let name = name.trim();
        let chars = name.chars().count();
        if !(GROUP_NAME_MIN_CHARS..=GROUP_NAME_MAX_CHARS).contains(&chars) {
            return Err(StudyspaceError::Validation(format!(
                "group name must be between {} and {} characters",
                GROUP_NAME_MIN_CHARS, GROUP_NAME_MAX_CHARS
            )));
        }

        let join_key = JoinKey::generate();
        let group = Group::create(name, &join_key, creator_id, &self.database)
            .await
            .map_err(|e| match e {
                StudyspaceError::Database(DatabaseError::UniqueViolation) => {
                    StudyspaceError::DuplicateJoinKey
                }
                other => other,
            })?;

        match Membership::create(&group.id, creator_id, &self.database).await {
            Ok(_) => {
                tracing::info!(
                    target: "studyspace::groups",
                    "Created group {} ({}) with join key {}",
                    group.name,
                    group.id,
                    group.join_key,
                );
                Ok(group)
            }
            Err(membership_err) => {
                // Group creation and the creator's membership are two separate
                // writes; delete the group again rather than leave it orphaned.
                match Group::delete(&group.id, &self.database).await {
                    Ok(()) => {
                        tracing::warn!(
                            target: "studyspace::groups",
                            "Rolled back group {} after membership insert failed: {}",
                            group.id,
                            membership_err,
                        );
                        Err(membership_err)
                    }
                    Err(delete_err) => {
                        tracing::error!(
                            target: "studyspace::groups",
                            "Group {} left without members: membership insert failed ({}) and cleanup failed ({})",
                            group.id,
                            membership_err,
                            delete_err,
                        );
                        Err(StudyspaceError::PartialFailure(format!(
                            "group {} was created without its creator's membership",
                            group.id
                        )))
                    }
                }
            }
        }
    }

    /// Joins a group by its shareable key.
    ///
    /// The key is case-normalized before lookup, so lower-case input matches
    /// the upper-cased stored key.
    pub async fn join_group(&self, join_key: &str, user_id: &Uuid) -> Result<Membership> {
        let normalized = JoinKey::normalize(join_key);
        if normalized.is_empty() {
            return Err(StudyspaceError::InvalidJoinKey);
        }

        let group = Group::find_by_join_key(&normalized, &self.database)
            .await?
            .ok_or(StudyspaceError::InvalidJoinKey)?;

        if Membership::exists(&group.id, user_id, &self.database).await? {
            return Err(StudyspaceError::AlreadyMember);
        }

        let membership = Membership::create(&group.id, user_id, &self.database)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent join by the same user.
                StudyspaceError::Database(DatabaseError::UniqueViolation) => {
                    StudyspaceError::AlreadyMember
                }
                other => other,
            })?;

        tracing::info!(
            target: "studyspace::groups",
            "User {} joined group {} ({})",
            user_id,
            group.name,
            group.id,
        );
        Ok(membership)
    }

    /// Fetches a group by id.
    pub async fn group_by_id(&self, id: &Uuid) -> Result<Group> {
        Group::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::GroupNotFound)
    }

    /// Users belonging to the group, in join order.
    pub async fn group_members(&self, group_id: &Uuid) -> Result<Vec<User>> {
        Membership::members_of(group_id, &self.database).await
    }

    /// Groups the user belongs to, newest first.
    pub async fn user_groups(&self, user_id: &Uuid) -> Result<Vec<Group>> {
        Group::for_user(user_id, &self.database).await
    }
}
