//! Shared helpers for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::studyspace::assistant::AssistantApi;
use crate::studyspace::error::{Result, StudyspaceError};
use crate::studyspace::identity::{IdentityProvider, Session, StaticIdentityProvider};
use crate::studyspace::moderation::{ProfanityClient, ProfanityVerdict};
use crate::studyspace::{Studyspace, StudyspaceConfig};

/// Short refresh interval so watch tests do not sit through the production
/// five-second cycle.
pub(crate) fn mock_refresh_interval() -> Duration {
    Duration::from_millis(100)
}

/// Classifier stub that considers everything clean.
#[derive(Default)]
pub(crate) struct CleanProfanityClient;

#[async_trait]
impl ProfanityClient for CleanProfanityClient {
    async fn classify(&self, _text: &str) -> Result<ProfanityVerdict> {
        Ok(ProfanityVerdict {
            is_profanity: false,
            score: 0.0,
        })
    }
}

/// Classifier stub that considers everything clean and counts how often it
/// was consulted.
#[derive(Default)]
pub(crate) struct CountingProfanityClient {
    calls: AtomicUsize,
}

impl CountingProfanityClient {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfanityClient for CountingProfanityClient {
    async fn classify(&self, _text: &str) -> Result<ProfanityVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProfanityVerdict {
            is_profanity: false,
            score: 0.0,
        })
    }
}

/// Classifier stub that always errors, simulating an outage.
pub(crate) struct FailingProfanityClient;

#[async_trait]
impl ProfanityClient for FailingProfanityClient {
    async fn classify(&self, _text: &str) -> Result<ProfanityVerdict> {
        Err(StudyspaceError::ExternalService(
            "classifier unavailable".to_string(),
        ))
    }
}

fn create_test_config() -> (StudyspaceConfig, TempDir, TempDir) {
    let data_temp = TempDir::new().expect("Failed to create temp data dir");
    let logs_temp = TempDir::new().expect("Failed to create temp logs dir");

    let mut config = StudyspaceConfig::new(data_temp.path(), logs_temp.path());
    config.refresh_interval = mock_refresh_interval();

    (config, data_temp, logs_temp)
}

async fn create_mock_with(
    identity: Arc<dyn IdentityProvider>,
    profanity_client: Arc<dyn ProfanityClient>,
) -> (Arc<Studyspace>, TempDir, TempDir) {
    let (config, data_temp, logs_temp) = create_test_config();

    let studyspace =
        Studyspace::initialize_with_profanity_client(config, identity, profanity_client)
            .await
            .expect("Failed to initialize mock studyspace");

    (Arc::new(studyspace), data_temp, logs_temp)
}

/// A mock instance with no signed-in session and a classifier that passes
/// everything clean; the local denylist still applies. Returns the instance
/// plus the temp dirs keeping its data and logs alive.
pub(crate) async fn create_mock_studyspace() -> (Arc<Studyspace>, TempDir, TempDir) {
    create_mock_with(
        Arc::new(StaticIdentityProvider::signed_out()),
        Arc::new(CleanProfanityClient),
    )
    .await
}

/// A mock instance whose identity provider reports the given session.
pub(crate) async fn create_mock_studyspace_signed_in_as(
    session: Session,
) -> (Arc<Studyspace>, TempDir, TempDir) {
    create_mock_with(
        Arc::new(StaticIdentityProvider::signed_in(session)),
        Arc::new(CleanProfanityClient),
    )
    .await
}

/// A mock instance exposing the classifier's call count, for asserting which
/// sends reach the remote step.
pub(crate) async fn create_mock_studyspace_with_counting_client()
-> (Arc<Studyspace>, Arc<CountingProfanityClient>, TempDir, TempDir) {
    let client = Arc::new(CountingProfanityClient::default());
    let (studyspace, data_temp, logs_temp) = create_mock_with(
        Arc::new(StaticIdentityProvider::signed_out()),
        client.clone(),
    )
    .await;
    (studyspace, client, data_temp, logs_temp)
}

/// A mock instance whose remote classifier always errors.
pub(crate) async fn create_mock_studyspace_with_failing_classifier()
-> (Arc<Studyspace>, TempDir, TempDir) {
    create_mock_with(
        Arc::new(StaticIdentityProvider::signed_out()),
        Arc::new(FailingProfanityClient),
    )
    .await
}

/// A mock instance with a caller-scripted assistant backend.
pub(crate) async fn create_mock_studyspace_with_assistant(
    assistant: Arc<dyn AssistantApi>,
) -> (Arc<Studyspace>, TempDir, TempDir) {
    let (config, data_temp, logs_temp) = create_test_config();

    let studyspace = Studyspace::initialize_with_clients(
        config,
        Arc::new(StaticIdentityProvider::signed_out()),
        Arc::new(CleanProfanityClient),
        assistant,
    )
    .await
    .expect("Failed to initialize mock studyspace");

    (Arc::new(studyspace), data_temp, logs_temp)
}
