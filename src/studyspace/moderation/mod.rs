//! Outgoing-message screening: an ordered validator pipeline run before any
//! message is persisted.
//!
//! Validators return a [`Verdict`]; the pipeline short-circuits on the first
//! `Reject` or `Allow` and keeps going on `Inconclusive`. The standard chain
//! is the local denylist check (cheap, runs first) followed by the remote
//! classifier.

use std::sync::Arc;

use async_trait::async_trait;

use crate::studyspace::error::{Result, StudyspaceError};

pub mod denylist;
pub mod remote;

pub use denylist::DenylistValidator;
pub use remote::{HttpProfanityClient, ProfanityClient, ProfanityVerdict, RemoteValidator};

/// Outcome of a single validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Definitely clean; later validators are skipped.
    Allow,
    /// Disallowed content; the send is rejected.
    Reject,
    /// This validator cannot decide on its own; the next one runs.
    Inconclusive,
}

/// A single screening step.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, text: &str) -> Result<Verdict>;
}

/// What to do when a validator errors (e.g. the remote classifier is
/// unreachable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The send fails with a generic send error. Matches the original
    /// behavior: third-party downtime blocks all sends.
    #[default]
    FailClosed,
    /// The failing validator is treated as inconclusive and the send
    /// proceeds on the remaining validators' verdicts.
    FailOpen,
}

/// Ordered chain of validators with a shared failure policy.
pub struct ModerationPipeline {
    validators: Vec<Arc<dyn Validator>>,
    policy: FailurePolicy,
}

impl ModerationPipeline {
    pub fn new(validators: Vec<Arc<dyn Validator>>, policy: FailurePolicy) -> Self {
        Self { validators, policy }
    }

    /// The standard two-step chain: local denylist, then remote classifier.
    pub fn standard(client: Arc<dyn ProfanityClient>, policy: FailurePolicy) -> Self {
        Self::new(
            vec![
                Arc::new(DenylistValidator),
                Arc::new(RemoteValidator::new(client)),
            ],
            policy,
        )
    }

    /// Screens a candidate message. `Ok(())` means the message may be
    /// persisted; `ContentRejected` means it tripped a validator;
    /// `SendFailed` means a validator errored under `FailClosed`.
    pub async fn screen(&self, text: &str) -> Result<()> {
        for validator in &self.validators {
            match validator.check(text).await {
                Ok(Verdict::Allow) => return Ok(()),
                Ok(Verdict::Reject) => {
                    tracing::info!(
                        target: "studyspace::moderation",
                        "Message rejected by validator {}",
                        validator.name(),
                    );
                    return Err(StudyspaceError::ContentRejected);
                }
                Ok(Verdict::Inconclusive) => continue,
                Err(e) => match self.policy {
                    FailurePolicy::FailClosed => {
                        tracing::warn!(
                            target: "studyspace::moderation",
                            "Validator {} failed, blocking send: {}",
                            validator.name(),
                            e,
                        );
                        return Err(StudyspaceError::SendFailed);
                    }
                    FailurePolicy::FailOpen => {
                        tracing::warn!(
                            target: "studyspace::moderation",
                            "Validator {} failed, continuing (fail-open): {}",
                            validator.name(),
                            e,
                        );
                        continue;
                    }
                },
            }
        }
        // Every validator was inconclusive (or errored under fail-open).
        Ok(())
    }
}
