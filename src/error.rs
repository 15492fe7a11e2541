//! Centralized error types for repolore, using thiserror.
//!
//! The taxonomy separates whole-run failures (propagated to the caller:
//! validation, auth, repository/project not found) from item-level failures
//! (absorbed into sentinel values by the pipelines). Only whole-run errors
//! ever cross an `ingest`/`poll` boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repolore.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed GitHub URL (owner/repo could not be parsed).
    #[error("Invalid GitHub URL: {0}")]
    InvalidRepoUrl(String),

    /// An identifier that must be non-empty was empty.
    #[error("Empty {0}")]
    EmptyField(&'static str),

    /// No token was supplied and `GITHUB_TOKEN` is not set.
    #[error("Missing GitHub token: pass one explicitly or set GITHUB_TOKEN")]
    MissingToken,

    /// The host rejected the credentials (HTTP 401).
    #[error("GitHub authentication failed: {0}")]
    Auth(String),

    /// The repository or branch does not exist (HTTP 404).
    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    /// Rate-limited or forbidden at the whole-repository level (HTTP 403).
    #[error("GitHub access forbidden (rate limit or missing permissions): {0}")]
    Forbidden(String),

    /// The project row is missing from the store, or has no GitHub URL.
    #[error("Project not found or missing a GitHub URL: {0}")]
    ProjectNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host or model replied with a payload we could not interpret.
    #[error("Unexpected {context} response: {detail}")]
    BadResponse {
        context: &'static str,
        detail: String,
    },

    /// Language-model call failed after retries were exhausted.
    #[error("Model call failed: {0}")]
    Model(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn bad_response(context: &'static str, detail: impl Into<String>) -> Self {
        Error::BadResponse {
            context,
            detail: detail.into(),
        }
    }

    /// Whole-run failure: the surrounding pipeline cannot produce anything
    /// and the error is propagated to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidRepoUrl(_)
                | Error::EmptyField(_)
                | Error::MissingToken
                | Error::Auth(_)
                | Error::RepoNotFound(_)
                | Error::Forbidden(_)
                | Error::ProjectNotFound(_)
                | Error::Config(_)
        )
    }

    /// Item-level failure: the pipelines absorb these into sentinel values
    /// and keep processing siblings.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::BadResponse { .. } | Error::Model(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_url() {
        let err = Error::InvalidRepoUrl("not-a-url".to_string());
        assert_eq!(err.to_string(), "Invalid GitHub URL: not-a-url");
    }

    #[test]
    fn test_display_missing_token() {
        let err = Error::MissingToken;
        assert_eq!(
            err.to_string(),
            "Missing GitHub token: pass one explicitly or set GITHUB_TOKEN"
        );
    }

    #[test]
    fn test_display_bad_response() {
        let err = Error::bad_response("GitHub tree", "missing tree array");
        assert_eq!(
            err.to_string(),
            "Unexpected GitHub tree response: missing tree array"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::MissingToken.is_fatal());
        assert!(Error::RepoNotFound("o/r".to_string()).is_fatal());
        assert!(Error::ProjectNotFound("p1".to_string()).is_fatal());
        assert!(!Error::Model("timeout".to_string()).is_fatal());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Model("overloaded".to_string()).is_transient());
        assert!(Error::bad_response("Gemini embed", "no values").is_transient());
        assert!(!Error::Auth("bad token".to_string()).is_transient());
    }
}
