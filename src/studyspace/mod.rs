use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

pub mod assistant;
pub mod database;
pub mod documents;
pub mod error;
pub mod groups;
pub mod identity;
pub mod join_key;
pub mod message_streaming;
pub mod messages;
pub mod moderation;
pub mod storage;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod users;

use crate::init_tracing;

use assistant::{AssistantApi, HttpAssistantClient};
use database::Database;
use error::{Result, StudyspaceError};
use identity::IdentityProvider;
use message_streaming::GroupStreams;
use moderation::{FailurePolicy, HttpProfanityClient, ModerationPipeline, ProfanityClient};

/// How often each message watch falls back to a full refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_PROFANITY_ENDPOINT: &str = "https://vector.profanity.dev";
const DEFAULT_ASSISTANT_BASE_URL: &str = "http://localhost:5000";

#[derive(Clone, Debug)]
pub struct StudyspaceConfig {
    /// Directory for application data
    pub data_dir: PathBuf,

    /// Directory for application logs
    pub logs_dir: PathBuf,

    /// Interval of the periodic full refresh backing each message watch
    pub refresh_interval: Duration,

    /// Behavior when a moderation validator errors
    pub moderation_policy: FailurePolicy,

    /// Profanity classification service endpoint
    pub profanity_endpoint: String,

    /// Base URL of the study-assistant service
    pub assistant_base_url: String,
}

impl StudyspaceConfig {
    pub fn new(data_dir: &Path, logs_dir: &Path) -> Self {
        let env_suffix = if cfg!(debug_assertions) {
            "dev"
        } else {
            "release"
        };
        let formatted_data_dir = data_dir.join(env_suffix);
        let formatted_logs_dir = logs_dir.join(env_suffix);

        Self {
            data_dir: formatted_data_dir,
            logs_dir: formatted_logs_dir,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            moderation_policy: FailurePolicy::default(),
            profanity_endpoint: DEFAULT_PROFANITY_ENDPOINT.to_string(),
            assistant_base_url: DEFAULT_ASSISTANT_BASE_URL.to_string(),
        }
    }
}

/// The application core. Owns the database, blob storage, moderation
/// pipeline, assistant client, and the per-group message streams; all
/// operations hang off this struct. Embedders construct one instance and
/// share it.
pub struct Studyspace {
    pub config: StudyspaceConfig,
    pub(crate) database: Arc<Database>,
    pub(crate) storage: storage::Storage,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) moderation: ModerationPipeline,
    pub(crate) assistant: Arc<dyn AssistantApi>,
    pub(crate) group_streams: Arc<GroupStreams>,
}

impl std::fmt::Debug for Studyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studyspace")
            .field("config", &self.config)
            .field("database", &"<REDACTED>")
            .field("storage", &"<REDACTED>")
            .field("identity", &"<REDACTED>")
            .field("moderation", &"<REDACTED>")
            .field("assistant", &"<REDACTED>")
            .field("group_streams", &"<REDACTED>")
            .finish()
    }
}

impl Studyspace {
    /// Initializes the application core with the provided configuration.
    ///
    /// Sets up the data and log directories, configures logging, opens the
    /// database, and wires the default moderation pipeline (local denylist,
    /// then the configured remote classifier).
    pub async fn initialize(
        config: StudyspaceConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let client = Arc::new(HttpProfanityClient::new(config.profanity_endpoint.clone())?);
        Self::initialize_with_profanity_client(config, identity, client).await
    }

    /// Like [`initialize`](Self::initialize), but with a caller-supplied
    /// classification client. Used by embedders with their own moderation
    /// backend, and by tests.
    pub async fn initialize_with_profanity_client(
        config: StudyspaceConfig,
        identity: Arc<dyn IdentityProvider>,
        profanity_client: Arc<dyn ProfanityClient>,
    ) -> Result<Self> {
        let assistant = Arc::new(HttpAssistantClient::new(config.assistant_base_url.clone())?);
        Self::initialize_with_clients(config, identity, profanity_client, assistant).await
    }

    /// Fully dependency-injected constructor: classification and assistant
    /// backends both supplied by the caller.
    pub async fn initialize_with_clients(
        config: StudyspaceConfig,
        identity: Arc<dyn IdentityProvider>,
        profanity_client: Arc<dyn ProfanityClient>,
        assistant: Arc<dyn AssistantApi>,
    ) -> Result<Self> {
        if config.refresh_interval.is_zero() {
            return Err(StudyspaceError::Configuration(
                "refresh_interval cannot be zero".to_string(),
            ));
        }

        let data_dir = &config.data_dir;
        let logs_dir = &config.logs_dir;

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))
            .map_err(StudyspaceError::from)?;
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))
            .map_err(StudyspaceError::from)?;

        // Only initialize tracing once
        init_tracing(logs_dir);

        tracing::debug!(
            target: "studyspace::initialize",
            "Logging initialized in directory: {:?}",
            logs_dir,
        );

        let database = Arc::new(Database::new(data_dir.join("studyspace.sqlite")).await?);
        let storage = storage::Storage::new(data_dir).await?;
        let moderation = ModerationPipeline::standard(profanity_client, config.moderation_policy);

        tracing::info!(
            target: "studyspace::initialize",
            "Studyspace initialized with data directory: {:?}",
            data_dir,
        );

        Ok(Self {
            config,
            database,
            storage,
            identity,
            moderation,
            assistant,
            group_streams: Arc::new(GroupStreams::default()),
        })
    }

    /// Deletes all application data: every database row and every stored
    /// document blob. Intended for logout-and-wipe flows.
    pub async fn delete_all_data(&self) -> Result<()> {
        self.database.delete_all_data().await?;

        let documents_dir = self.config.data_dir.join("documents");
        if documents_dir.exists() {
            tokio::fs::remove_dir_all(&documents_dir).await?;
            tokio::fs::create_dir_all(&documents_dir).await?;
        }

        tracing::info!(target: "studyspace::delete_all_data", "All application data deleted");
        Ok(())
    }
}
