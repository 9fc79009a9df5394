//! Group chat messages and the moderated send path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};
use crate::studyspace::groups::Group;
use crate::studyspace::message_streaming::MessagePush;

pub const MESSAGE_MAX_CHARS: usize = 2000;

/// A chat message with the author's display name denormalized in, so
/// rendering a timeline needs no per-message profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    /// `None` when the author's profile has since been deleted.
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Studyspace {
    /// Sends a message to a group.
    ///
    /// The content is screened by the moderation pipeline before anything is
    /// written; a rejected message is never persisted and never reaches the
    /// push feed. On success the message is broadcast to active watchers of
    /// the group.
    pub async fn send_message(
        &self,
        group_id: &Uuid,
        author_id: &Uuid,
        content: &str,
    ) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StudyspaceError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MESSAGE_MAX_CHARS {
            return Err(StudyspaceError::Validation(format!(
                "message cannot exceed {} characters",
                MESSAGE_MAX_CHARS
            )));
        }

        Group::find_by_id(group_id, &self.database)
            .await?
            .ok_or(StudyspaceError::GroupNotFound)?;

        self.moderation.screen(content).await?;

        let message = Message::create(group_id, author_id, content, &self.database).await?;

        self.group_streams.notify(MessagePush {
            group_id: *group_id,
            message_id: message.id,
        });

        tracing::debug!(
            target: "studyspace::messages",
            "Message {} sent to group {}",
            message.id,
            group_id,
        );
        Ok(message)
    }

    /// All messages in a group, oldest first.
    pub async fn group_messages(&self, group_id: &Uuid) -> Result<Vec<Message>> {
        Group::find_by_id(group_id, &self.database)
            .await?
            .ok_or(StudyspaceError::GroupNotFound)?;
        Message::for_group(group_id, &self.database).await
    }

    /// Fetches one message by id.
    pub async fn message_by_id(&self, id: &Uuid) -> Result<Message> {
        Message::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::MessageNotFound)
    }
}
