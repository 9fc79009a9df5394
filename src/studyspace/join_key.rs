//! Short shareable tokens used to join a group without a direct invite.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of generated join keys.
pub const JOIN_KEY_LEN: usize = 8;

const JOIN_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A group's invite token: uppercase alphanumeric, displayed to users as-is.
///
/// Generation is random and does NOT guarantee uniqueness; the database's
/// UNIQUE constraint is the sole enforcement, and creation fails on a
/// collision (the caller retries).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinKey(String);

impl JoinKey {
    /// Generates a random key of [`JOIN_KEY_LEN`] uppercase alphanumerics.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let key = (0..JOIN_KEY_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..JOIN_KEY_CHARSET.len());
                JOIN_KEY_CHARSET[idx] as char
            })
            .collect();
        Self(key)
    }

    /// Wraps a key read back from the database.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// Canonical form of user input: trimmed and upper-cased, so a lower-case
    /// submission matches the upper-cased stored key.
    pub fn normalize(input: &str) -> String {
        input.trim().to_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JoinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
