//! User profiles backing the denormalized author name on messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};

/// A user profile. Authentication lives behind
/// [`crate::studyspace::identity::IdentityProvider`]; this is only the
/// profile data other users see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Studyspace {
    /// Creates a user profile.
    pub async fn create_user(&self, display_name: &str, email: Option<&str>) -> Result<User> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(StudyspaceError::Validation(
                "display name cannot be empty".to_string(),
            ));
        }
        User::create(display_name, email, &self.database).await
    }

    /// Fetches a user profile by id.
    pub async fn user_by_id(&self, id: &Uuid) -> Result<User> {
        User::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::UserNotFound)
    }

    /// Updates the display name shown next to the user's messages.
    pub async fn update_display_name(&self, id: &Uuid, display_name: &str) -> Result<User> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(StudyspaceError::Validation(
                "display name cannot be empty".to_string(),
            ));
        }
        User::update_display_name(id, display_name, &self.database).await
    }
}
