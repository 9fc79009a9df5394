use thiserror::Error;

use crate::studyspace::database::DatabaseError;

pub type Result<T> = core::result::Result<T, StudyspaceError>;

/// Crate-wide error type. `Display` strings double as the user-visible
/// messages; no structured error codes are exposed beyond the variant.
#[derive(Error, Debug)]
pub enum StudyspaceError {
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("You must be logged in to do that")]
    AuthenticationRequired,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Group not found")]
    GroupNotFound,

    #[error("Invalid join key")]
    InvalidJoinKey,

    #[error("You are already a member of this group")]
    AlreadyMember,

    #[error("Join key collided with an existing group, retry creating the group")]
    DuplicateJoinKey,

    #[error("Message not found")]
    MessageNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Document not found")]
    DocumentNotFound,

    #[error(
        "Please keep the conversation respectful. Your message contains inappropriate content."
    )]
    ContentRejected,

    #[error("Failed to send message. Please try again.")]
    SendFailed,

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for StudyspaceError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        StudyspaceError::Other(anyhow::anyhow!(err.to_string()))
    }
}
