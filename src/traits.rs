//! Pipeline seams: the traits the coordinators are built against.
//!
//! [`IngestionCoordinator`](crate::ingest::IngestionCoordinator) and
//! [`CommitTracker`](crate::poll::CommitTracker) never talk to GitHub,
//! Gemini, or SQLite directly — they hold trait objects, so tests (and
//! alternative hosts or models) plug in without touching the pipeline
//! logic.
//!
//! ```text
//! ┌──────────────────┐     ┌────────────┐     ┌──────────┐
//! │ RepositorySource │────▶│ Summarizer │────▶│ Embedder │
//! │   CommitSource   │     │ (sentinel, │     │ (empty = │
//! │  (fail-fast at   │     │  never     │     │  unavail-│
//! │   repo level)    │     │  errors)   │     │  able)   │
//! └──────────────────┘     └────────────┘     └────┬─────┘
//!                                                  ▼
//!                                            ┌───────────┐
//!                                            │   Store   │
//!                                            └───────────┘
//! ```
//!
//! Error discipline across these seams follows the run/item split:
//! [`RepositorySource`] and [`CommitSource`] return `Result` because their
//! failures abort a whole run; [`Summarizer`] and [`Embedder`] are
//! infallible by contract and absorb their own failures into sentinels.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CommitInfo, RepoDocument};

/// Produces the filtered file set of a repository at a fixed branch.
///
/// # Contract
///
/// - Binary and irrelevant paths are excluded before content is fetched.
/// - Traversal concurrency is capped independently of repository size.
/// - A missing/invalid token, or 404/403 on the repository itself, is a
///   whole-run error: no documents can be produced at all.
/// - A failed fetch of a single file is skipped with a warning and does
///   not abort the traversal.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Fetch all ingestable documents for `github_url`.
    ///
    /// `token` overrides the source's configured credentials for this
    /// call (projects can carry their own token).
    async fn fetch_documents(
        &self,
        github_url: &str,
        token: Option<&str>,
    ) -> Result<Vec<RepoDocument>>;
}

/// Fetches ordered commit metadata and per-commit diffs.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Return up to the configured number of newest commits for
    /// `github_url`, ordered by commit date descending; ties broken by
    /// hash so the order is deterministic.
    async fn recent_commits(&self, github_url: &str) -> Result<Vec<CommitInfo>>;

    /// Return the unified diff for one commit.
    ///
    /// Failures here are item-level: the caller converts them to a
    /// sentinel summary rather than aborting its batch.
    async fn commit_diff(&self, github_url: &str, commit_hash: &str) -> Result<String>;
}

/// Turns code or a diff into a short natural-language description.
///
/// Infallible by contract: inputs are truncated to a fixed bound before
/// the model sees them, empty input short-circuits to a placeholder
/// without a model call, and model failure yields a fixed sentinel
/// string. See [`crate::summarize`] for the exact strings.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one source file. `file_name` gives the model context.
    async fn summarize_code(&self, file_name: &str, content: &str) -> String;

    /// Summarize a unified diff.
    async fn summarize_diff(&self, diff: &str) -> String;
}

/// Turns a summary into a fixed-dimension vector.
///
/// Infallible by contract: empty input or model failure returns an empty
/// vector, which callers treat as "no embedding available" — they skip
/// the vector write for that item and move on.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}
