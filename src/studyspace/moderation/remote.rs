//! Remote profanity classification.
//!
//! The classifier is an external HTTP service that scores a message; anything
//! it flags, or scores above [`SCORE_THRESHOLD`], is rejected. The HTTP
//! transport sits behind [`ProfanityClient`] so tests can substitute scripted
//! verdicts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Validator, Verdict};
use crate::studyspace::error::{Result, StudyspaceError};

/// Messages scoring strictly above this are rejected even when the service
/// does not flag them outright.
pub const SCORE_THRESHOLD: f64 = 0.9;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Classification result for a single message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfanityVerdict {
    #[serde(rename = "isProfanity")]
    pub is_profanity: bool,
    #[serde(default)]
    pub score: f64,
}

/// Transport seam for the classification service.
#[async_trait]
pub trait ProfanityClient: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ProfanityVerdict>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    message: &'a str,
}

/// Production client speaking the classifier's JSON protocol.
pub struct HttpProfanityClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProfanityClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StudyspaceError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ProfanityClient for HttpProfanityClient {
    async fn classify(&self, text: &str) -> Result<ProfanityVerdict> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { message: text })
            .send()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StudyspaceError::ExternalService(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        response
            .json::<ProfanityVerdict>()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))
    }
}

/// Validator wrapping a [`ProfanityClient`].
pub struct RemoteValidator {
    client: Arc<dyn ProfanityClient>,
}

impl RemoteValidator {
    pub fn new(client: Arc<dyn ProfanityClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Validator for RemoteValidator {
    fn name(&self) -> &'static str {
        "remote-classifier"
    }

    async fn check(&self, text: &str) -> Result<Verdict> {
        let verdict = self.client.classify(text).await?;
        if verdict.is_profanity || verdict.score > SCORE_THRESHOLD {
            tracing::debug!(
                target: "studyspace::moderation",
                "Classifier flagged message (is_profanity={}, score={})",
                verdict.is_profanity,
                verdict.score,
            );
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Allow)
        }
    }
}
