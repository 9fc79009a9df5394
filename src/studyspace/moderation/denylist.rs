//! Local denylist check with leetspeak normalization.
//!
//! Cheap first line of defense: obvious slurs are caught here without a
//! network round-trip. The check is deliberately conservative, so a clean
//! result is [`Verdict::Inconclusive`] rather than `Allow` and the remote
//! classifier still runs.

use async_trait::async_trait;

use super::{Validator, Verdict};
use crate::studyspace::error::Result;

/// Terms rejected outright, matched against the normalized message.
const DENYLIST: &[&str] = &[
    "fuck", "shit", "bitch", "asshole", "bastard", "dick", "cunt", "whore",
    "slut", "nigger", "nigga", "faggot", "retard", "motherfucker",
];

/// Digit/symbol substitutions commonly used to dodge word filters.
const SUBSTITUTIONS: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('8', 'b'),
    ('$', 's'),
    ('@', 'a'),
    ('!', 'i'),
];

/// Masking punctuation stripped before matching, so "s*h*i*t" collapses back
/// to the denied term.
const STRIPPED: &[char] = &['*', '#', '%', '^', '&'];

/// Lower-cases, maps leet substitutions to letters, and drops masking
/// punctuation.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if STRIPPED.contains(&c) {
                return None;
            }
            match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
                Some((_, to)) => Some(*to),
                None => Some(c),
            }
        })
        .collect()
}

fn contains_denied_term(text: &str) -> bool {
    let normalized = normalize(text);
    DENYLIST.iter().any(|term| normalized.contains(term))
}

/// Stateless denylist validator.
pub struct DenylistValidator;

#[async_trait]
impl Validator for DenylistValidator {
    fn name(&self) -> &'static str {
        "denylist"
    }

    async fn check(&self, text: &str) -> Result<Verdict> {
        if contains_denied_term(text) {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Inconclusive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_profanity_is_rejected() {
        let verdict = DenylistValidator.check("well shit").await.unwrap();
        assert_eq!(verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn leetspeak_profanity_is_rejected() {
        for message in ["sh1t happens", "b!tch", "5h1t", "4sshole"] {
            let verdict = DenylistValidator.check(message).await.unwrap();
            assert_eq!(verdict, Verdict::Reject, "expected reject for {message:?}");
        }
    }

    #[tokio::test]
    async fn masked_profanity_is_rejected() {
        let verdict = DenylistValidator.check("s*h*i*t happens").await.unwrap();
        assert_eq!(verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn mixed_case_profanity_is_rejected() {
        let verdict = DenylistValidator.check("ShIt").await.unwrap();
        assert_eq!(verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn clean_text_is_inconclusive_not_allow() {
        let verdict = DenylistValidator
            .check("When is the exam on graph theory?")
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Inconclusive);
    }

    #[tokio::test]
    async fn empty_text_is_inconclusive() {
        let verdict = DenylistValidator.check("").await.unwrap();
        assert_eq!(verdict, Verdict::Inconclusive);
    }

    #[test]
    fn normalize_applies_substitutions_and_strips_masks() {
        assert_eq!(normalize("5H1T"), "shit");
        assert_eq!(normalize("s*h*i*t"), "shit");
        assert_eq!(normalize("hello"), "hello");
    }
}
