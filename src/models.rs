//! Core data models used throughout repolore.
//!
//! These types represent the projects, documents, and commits that flow
//! through the ingestion and commit-tracking pipelines, plus the raw
//! host-side items they are built from.

use chrono::{DateTime, Utc};

/// A tracked repository. Soft-deleted via `deleted_at`, never removed;
/// archived projects keep their ingested documents and commits.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub github_url: String,
    pub github_token: Option<String>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// A summarized, optionally embedded source file.
///
/// `embedding` is empty when no vector could be produced — empty means
/// "unavailable", not an error. Rows are not deduplicated across runs;
/// re-ingesting a project creates new rows.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub file_name: String,
    pub source_code: String,
    pub summary: String,
    pub embedding: Vec<f32>,
}

/// A summarized commit persisted by the tracker.
///
/// `(project_id, commit_hash)` is unique; conflicting inserts are no-ops
/// at the store.
#[derive(Debug, Clone)]
pub struct Commit {
    pub id: String,
    pub project_id: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub commit_author_name: String,
    pub commit_author_avatar: String,
    pub commit_date: i64,
    pub summary: String,
}

/// Raw file pulled from the repository tree, before summarization.
#[derive(Debug, Clone)]
pub struct RepoDocument {
    pub path: String,
    pub content: String,
}

/// Commit metadata fetched from the host, newest first.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub commit_hash: String,
    pub commit_message: String,
    pub commit_author_name: String,
    pub commit_author_avatar: String,
    pub commit_date: DateTime<Utc>,
}

/// Outcome tally of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
}
