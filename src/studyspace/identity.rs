//! Session seam for the external identity provider.
//!
//! The authentication protocol itself (passwords, OAuth, token refresh) is
//! delegated to whatever provider the embedding application wires in; this
//! crate only consumes the resulting session.

use async_trait::async_trait;
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};

/// An authenticated session as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
}

/// Contract the embedding application implements against its identity
/// service (email/password or OAuth).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    async fn current_user(&self) -> Result<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;
}

/// Provider with a fixed, pre-established session. Useful for embedders that
/// authenticate out-of-band, and for tests.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    session: Option<Session>,
}

impl StaticIdentityProvider {
    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self) -> Result<Option<Session>> {
        Ok(self.session.clone())
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session> {
        self.session
            .clone()
            .ok_or(StudyspaceError::AuthenticationRequired)
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Session> {
        Err(StudyspaceError::Configuration(
            "StaticIdentityProvider cannot register accounts".to_string(),
        ))
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

impl Studyspace {
    /// Returns the current session, or `AuthenticationRequired` when the
    /// provider reports no signed-in user.
    pub async fn current_session(&self) -> Result<Session> {
        self.identity
            .current_user()
            .await?
            .ok_or(StudyspaceError::AuthenticationRequired)
    }
}
